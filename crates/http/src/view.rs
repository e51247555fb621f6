use anyhow::Context;
use serde::Serialize;

use crate::controller::DisplayResult;

const LAYOUT_TEMPLATE: &str = include_str!("../templates/layout.html.liquid");

/// What a page hands to the layout.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ViewData {
    pub title: &'static str,
    pub secret: Option<String>,
    pub error: Option<String>,
    pub message: Option<String>,
}

impl ViewData {
    pub fn index(result: DisplayResult) -> Self {
        let (secret, error) = match result {
            DisplayResult::Success(message) => (Some(message), None),
            DisplayResult::Failure(message) => (None, Some(message)),
        };
        Self {
            title: "Home Page",
            secret,
            error,
            message: None,
        }
    }

    pub fn about(message: &str) -> Self {
        Self {
            title: "About",
            message: Some(message.to_string()),
            ..Default::default()
        }
    }

    pub fn contact(message: &str) -> Self {
        Self {
            title: "Contact",
            message: Some(message.to_string()),
            ..Default::default()
        }
    }
}

/// The shared page layout, parsed once and rendered per request.
pub struct Layout {
    template: liquid::Template,
}

impl Layout {
    pub fn new() -> anyhow::Result<Self> {
        let template = liquid::ParserBuilder::with_stdlib()
            .build()?
            .parse(LAYOUT_TEMPLATE)
            .context("Invalid page layout template")?;
        Ok(Self { template })
    }

    /// Renders a page inside the layout. Interpolated text is HTML-escaped.
    pub fn render(&self, view: &ViewData) -> anyhow::Result<String> {
        let globals = liquid::to_object(view)?;
        Ok(self.template.render(&globals)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(view: ViewData) -> String {
        Layout::new().unwrap().render(&view).unwrap()
    }

    #[test]
    fn index_success_shows_secret_only() {
        let html = render(ViewData::index(DisplayResult::Success("Secret: V".into())));
        assert!(html.contains("<p class=\"secret\">Secret: V</p>"), "{html}");
        assert!(!html.contains("class=\"error\""));
        assert!(html.contains("<title>Home Page - Key Vault Web</title>"));
    }

    #[test]
    fn index_failure_shows_error_only() {
        let html = render(ViewData::index(DisplayResult::Failure(
            "Something went wrong: boom".into(),
        )));
        assert!(html.contains("<p class=\"error\">Something went wrong: boom</p>"), "{html}");
        assert!(!html.contains("class=\"secret\""));
    }

    #[test]
    fn static_page_shows_message() {
        let html = render(ViewData::contact("Your contact page."));
        assert!(html.contains("<h2>Contact</h2>"));
        assert!(html.contains("<h3>Your contact page.</h3>"));
        assert!(!html.contains("<p class="));
    }

    #[test]
    fn interpolated_text_is_escaped() {
        let html = render(ViewData::index(DisplayResult::Success(
            "Secret: <script>alert(1)</script> & \"more\"".into(),
        )));
        assert!(!html.contains("<script>"), "{html}");
        assert!(html.contains("Secret: &lt;script&gt;alert(1)&lt;/script&gt; &amp; &quot;more&quot;"));
    }

    #[test]
    fn layout_links_every_page() {
        let html = render(ViewData::about("Your application description page."));
        for href in ["/Home/Index", "/Home/About", "/Home/Contact"] {
            assert!(html.contains(&format!("href=\"{href}\"")), "{href}");
        }
    }
}
