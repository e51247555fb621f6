use std::{
    collections::HashMap,
    env::VarError,
    fmt,
    path::{Path, PathBuf},
    sync::OnceLock,
};

use url::Url;

use crate::RetrievalError;

/// The configuration value holding the vault endpoint.
pub const KEY_VAULT_URI: &str = "KEY_VAULT_URI";

/// The absolute URI of a secret store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VaultEndpoint(Url);

impl VaultEndpoint {
    /// Parses an endpoint, rejecting anything that is not an absolute URI with a host.
    ///
    /// Rejects early what `SecretClient::new` would reject anyway.
    pub fn parse(raw: &str) -> Result<Self, RetrievalError> {
        let invalid = |reason: String| RetrievalError::InvalidEndpoint {
            endpoint: raw.to_string(),
            reason,
        };
        let url = Url::parse(raw).map_err(|err| invalid(err.to_string()))?;
        if url.cannot_be_a_base() || url.host_str().is_none() {
            return Err(invalid("expected an absolute URI with a host".into()));
        }
        Ok(Self(url))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn url(&self) -> &Url {
        &self.0
    }
}

impl fmt::Display for VaultEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

type EnvFetcherFn = Box<dyn Fn(&str) -> Result<String, VarError> + Send + Sync>;

/// Resolves the [`VaultEndpoint`] from the process environment.
///
/// The variable is re-read on every call. When it is not present in the
/// environment, an optional dotenv file is consulted instead.
pub struct EndpointResolver {
    var_name: String,
    env_fetcher: EnvFetcherFn,
    dotenv_path: Option<PathBuf>,
    dotenv_cache: OnceLock<HashMap<String, String>>,
}

impl EndpointResolver {
    /// Creates a new resolver.
    ///
    /// * `var_name` - The variable holding the endpoint.
    /// * `env_fetcher` - The function used to read a variable from the environment.
    /// * `dotenv_path` - A dotenv file to fall back to. If not set, only the
    ///   environment is consulted.
    pub fn new(
        var_name: impl Into<String>,
        env_fetcher: impl Fn(&str) -> Result<String, VarError> + Send + Sync + 'static,
        dotenv_path: Option<PathBuf>,
    ) -> Self {
        Self {
            var_name: var_name.into(),
            env_fetcher: Box::new(env_fetcher),
            dotenv_path,
            dotenv_cache: Default::default(),
        }
    }

    /// Reads `KEY_VAULT_URI` from the process environment, falling back to `dotenv_path`.
    pub fn from_env(dotenv_path: Option<PathBuf>) -> Self {
        Self::new(KEY_VAULT_URI, |s| std::env::var(s), dotenv_path)
    }

    /// Resolves and validates the endpoint.
    pub fn resolve(&self) -> Result<VaultEndpoint, RetrievalError> {
        let raw = self
            .query_env()?
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| RetrievalError::MissingEndpoint(self.var_name.clone()))?;
        VaultEndpoint::parse(raw.trim())
    }

    fn query_env(&self) -> Result<Option<String>, RetrievalError> {
        match (self.env_fetcher)(&self.var_name) {
            Ok(value) => Ok(Some(value)),
            Err(VarError::NotPresent) => self.get_dotenv(),
            Err(err) => Err(RetrievalError::Config(format!(
                "failed to read {}: {err}",
                self.var_name
            ))),
        }
    }

    fn get_dotenv(&self) -> Result<Option<String>, RetrievalError> {
        let Some(dotenv_path) = self.dotenv_path.as_deref() else {
            return Ok(None);
        };
        let cache = match self.dotenv_cache.get() {
            Some(cache) => cache,
            None => {
                let loaded = load_dotenv(dotenv_path)?;
                self.dotenv_cache.get_or_init(|| loaded)
            }
        };
        Ok(cache.get(&self.var_name).cloned())
    }
}

impl fmt::Debug for EndpointResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointResolver")
            .field("var_name", &self.var_name)
            .field("dotenv_path", &self.dotenv_path)
            .finish()
    }
}

// A missing dotenv file is an empty one.
fn load_dotenv(dotenv_path: &Path) -> Result<HashMap<String, String>, RetrievalError> {
    dotenvy::from_path_iter(dotenv_path)
        .into_iter()
        .flatten()
        .collect::<Result<HashMap<String, String>, _>>()
        .map_err(|err| {
            RetrievalError::Config(format!("failed to load {}: {err}", dotenv_path.display()))
        })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn resolver(value: Option<&str>, dotenv_path: Option<PathBuf>) -> EndpointResolver {
        let value = value.map(str::to_string);
        EndpointResolver::new(
            KEY_VAULT_URI,
            move |_| value.clone().ok_or(VarError::NotPresent),
            dotenv_path,
        )
    }

    #[test]
    fn resolves_from_environment() {
        let endpoint = resolver(Some("https://my-vault.vault.azure.net/"), None)
            .resolve()
            .unwrap();
        assert_eq!(endpoint.as_str(), "https://my-vault.vault.azure.net/");
        assert_eq!(endpoint.url().host_str(), Some("my-vault.vault.azure.net"));
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        let endpoint = resolver(Some("  https://my-vault.vault.azure.net  "), None)
            .resolve()
            .unwrap();
        assert_eq!(endpoint.to_string(), "https://my-vault.vault.azure.net/");
    }

    #[test]
    fn missing_variable_is_an_error() {
        let err = resolver(None, None).resolve().unwrap_err();
        assert!(matches!(err, RetrievalError::MissingEndpoint(ref v) if v == KEY_VAULT_URI));
    }

    #[test]
    fn empty_variable_is_an_error() {
        let err = resolver(Some("   "), None).resolve().unwrap_err();
        assert!(matches!(err, RetrievalError::MissingEndpoint(_)));
    }

    #[test]
    fn relative_uri_is_rejected() {
        let err = resolver(Some("my-vault/secrets"), None)
            .resolve()
            .unwrap_err();
        assert!(matches!(err, RetrievalError::InvalidEndpoint { .. }), "{err}");
    }

    #[test]
    fn uri_without_host_is_rejected() {
        let err = VaultEndpoint::parse("mailto:ops@example.com").unwrap_err();
        assert!(matches!(err, RetrievalError::InvalidEndpoint { .. }), "{err}");
    }

    #[test]
    fn non_unicode_value_is_a_config_error() {
        let resolver = EndpointResolver::new(
            KEY_VAULT_URI,
            |_| Err(VarError::NotUnicode("\u{fffd}".into())),
            None,
        );
        assert!(matches!(
            resolver.resolve().unwrap_err(),
            RetrievalError::Config(_)
        ));
    }

    #[test]
    fn falls_back_to_dotenv() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "KEY_VAULT_URI=https://from-dotenv.vault.azure.net/").unwrap();

        let endpoint = resolver(None, Some(file.path().to_path_buf()))
            .resolve()
            .unwrap();
        assert_eq!(endpoint.as_str(), "https://from-dotenv.vault.azure.net/");
    }

    #[test]
    fn environment_wins_over_dotenv() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "KEY_VAULT_URI=https://from-dotenv.vault.azure.net/").unwrap();

        let endpoint = resolver(
            Some("https://from-env.vault.azure.net/"),
            Some(file.path().to_path_buf()),
        )
        .resolve()
        .unwrap();
        assert_eq!(endpoint.as_str(), "https://from-env.vault.azure.net/");
    }

    #[test]
    fn missing_dotenv_file_is_treated_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolver(None, Some(dir.path().join("absent.env")))
            .resolve()
            .unwrap_err();
        assert!(matches!(err, RetrievalError::MissingEndpoint(_)));
    }
}
