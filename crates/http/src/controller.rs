use std::sync::Arc;

use kvweb_secrets::{RetrieveSecret, SECRET_NAME};

/// The text shown on the About page.
pub const ABOUT_MESSAGE: &str = "Your application description page.";

/// The text shown on the Contact page.
pub const CONTACT_MESSAGE: &str = "Your contact page.";

/// The outcome of the index page's secret lookup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DisplayResult {
    Success(String),
    Failure(String),
}

impl DisplayResult {
    pub fn message(&self) -> &str {
        match self {
            Self::Success(message) | Self::Failure(message) => message,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// Handlers for the Home, About and Contact pages.
#[derive(Clone)]
pub struct HomeController {
    secrets: Arc<dyn RetrieveSecret>,
}

impl HomeController {
    pub fn new(secrets: Arc<dyn RetrieveSecret>) -> Self {
        Self { secrets }
    }

    /// Fetches the secret and formats it for display.
    ///
    /// Never fails: every retrieval error is folded into
    /// [`DisplayResult::Failure`].
    pub async fn index(&self) -> DisplayResult {
        match self.secrets.retrieve(SECRET_NAME).await {
            Ok(value) => DisplayResult::Success(format!("Secret: {value}")),
            Err(err) => {
                tracing::warn!(error = %err, "Secret retrieval failed");
                DisplayResult::Failure(format!("Something went wrong: {err}"))
            }
        }
    }

    pub fn about(&self) -> &'static str {
        ABOUT_MESSAGE
    }

    pub fn contact(&self) -> &'static str {
        CONTACT_MESSAGE
    }
}
