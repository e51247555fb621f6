//! Route matching for the page server.

/// Prefix for paths served by the server itself rather than a page.
pub const WELL_KNOWN_PREFIX: &str = "/.well-known/kvweb/";

/// A page or built-in endpoint the server can serve.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    Index,
    About,
    Contact,
    Health,
}

impl Route {
    /// Matches a request path against the `{controller=Home}/{action=Index}` convention.
    ///
    /// Matching ignores ASCII case and a trailing slash.
    pub fn resolve(path: &str) -> Option<Self> {
        if let Some(well_known) = path.strip_prefix(WELL_KNOWN_PREFIX) {
            return match well_known {
                "health" => Some(Self::Health),
                _ => None,
            };
        }

        let trimmed = path.trim_end_matches('/').to_ascii_lowercase();
        let mut segments = trimmed.split('/').filter(|s| !s.is_empty());
        let controller = segments.next().unwrap_or("home");
        let action = segments.next().unwrap_or("index");
        if controller != "home" || segments.next().is_some() {
            return None;
        }
        match action {
            "index" => Some(Self::Index),
            "about" => Some(Self::About),
            "contact" => Some(Self::Contact),
            _ => None,
        }
    }

    /// The canonical route, recorded as `http.route` on request spans.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Index => "/Home/Index",
            Self::About => "/Home/About",
            Self::Contact => "/Home/Contact",
            Self::Health => "/.well-known/kvweb/health",
        }
    }
}
