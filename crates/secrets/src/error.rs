/// Every way a secret retrieval can fail.
///
/// Callers that only display the outcome use the `Display` text as the
/// failure message.
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    /// The endpoint configuration value is absent or empty.
    #[error("the {0} configuration value is not set")]
    MissingEndpoint(String),

    /// The endpoint configuration value is not an absolute URI.
    #[error("invalid vault endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    /// No credential could be acquired.
    #[error("failed to acquire credential: {0:#}")]
    Credential(#[source] anyhow::Error),

    /// The store rejected or could not serve the request.
    #[error("failed to read secret {name:?} from {endpoint}: {source:#}")]
    Fetch {
        name: String,
        endpoint: String,
        #[source]
        source: anyhow::Error,
    },

    /// Configuration could not be read.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl RetrievalError {
    pub(crate) fn fetch(
        name: &str,
        endpoint: impl std::fmt::Display,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Fetch {
            name: name.to_string(),
            endpoint: endpoint.to_string(),
            source: source.into(),
        }
    }
}
