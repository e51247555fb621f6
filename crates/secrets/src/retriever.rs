use async_trait::async_trait;

use crate::{CredentialProvider, EndpointResolver, RetrievalError, SecretStore};

/// Retrieves a named secret end to end.
#[async_trait]
pub trait RetrieveSecret: Send + Sync {
    async fn retrieve(&self, name: &str) -> Result<String, RetrievalError>;
}

/// Resolves the endpoint, acquires a credential, and fetches from the store.
///
/// Nothing is cached between calls: each retrieval re-reads configuration,
/// asks for a fresh credential, and issues its own fetch.
#[derive(Debug)]
pub struct SecretRetriever<C, S> {
    resolver: EndpointResolver,
    credentials: C,
    store: S,
}

impl<C, S> SecretRetriever<C, S>
where
    C: CredentialProvider,
    S: SecretStore<Credential = C::Credential>,
{
    pub fn new(resolver: EndpointResolver, credentials: C, store: S) -> Self {
        Self {
            resolver,
            credentials,
            store,
        }
    }
}

#[async_trait]
impl<C, S> RetrieveSecret for SecretRetriever<C, S>
where
    C: CredentialProvider,
    S: SecretStore<Credential = C::Credential>,
{
    async fn retrieve(&self, name: &str) -> Result<String, RetrievalError> {
        let endpoint = self.resolver.resolve()?;
        let credential = self.credentials.credential()?;
        tracing::debug!(%endpoint, name, "Fetching secret");
        self.store.fetch_secret(&endpoint, credential, name).await
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        env::VarError,
        sync::atomic::{AtomicUsize, Ordering},
    };

    use super::*;
    use crate::{VaultEndpoint, KEY_VAULT_URI};

    const VAULT: &str = "https://test-vault.vault.azure.net/";

    #[derive(Debug)]
    struct FixedCredential(&'static str);

    impl CredentialProvider for FixedCredential {
        type Credential = String;

        fn credential(&self) -> Result<String, RetrievalError> {
            Ok(self.0.to_string())
        }
    }

    #[derive(Debug)]
    struct NoCredential;

    impl CredentialProvider for NoCredential {
        type Credential = String;

        fn credential(&self) -> Result<String, RetrievalError> {
            Err(RetrievalError::Credential(anyhow::anyhow!(
                "no managed identity endpoint available"
            )))
        }
    }

    #[derive(Debug, Default)]
    struct InMemoryStore {
        secrets: HashMap<String, String>,
        fetches: AtomicUsize,
    }

    impl InMemoryStore {
        fn with(name: &str, value: &str) -> Self {
            Self {
                secrets: HashMap::from([(name.to_string(), value.to_string())]),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl SecretStore for InMemoryStore {
        type Credential = String;

        async fn fetch_secret(
            &self,
            endpoint: &VaultEndpoint,
            credential: String,
            name: &str,
        ) -> Result<String, RetrievalError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if credential != "token" {
                return Err(RetrievalError::fetch(
                    name,
                    endpoint,
                    anyhow::anyhow!("401 Unauthorized"),
                ));
            }
            self.secrets
                .get(name)
                .cloned()
                .ok_or_else(|| RetrievalError::fetch(name, endpoint, anyhow::anyhow!("SecretNotFound")))
        }
    }

    fn resolver(value: Option<&'static str>) -> EndpointResolver {
        EndpointResolver::new(
            KEY_VAULT_URI,
            move |_| value.map(str::to_string).ok_or(VarError::NotPresent),
            None,
        )
    }

    #[tokio::test]
    async fn retrieves_existing_secret() {
        let retriever = SecretRetriever::new(
            resolver(Some(VAULT)),
            FixedCredential("token"),
            InMemoryStore::with("secret", "hunter2"),
        );
        assert_eq!(retriever.retrieve("secret").await.unwrap(), "hunter2");
    }

    #[tokio::test]
    async fn missing_secret_reports_store_error() {
        let retriever = SecretRetriever::new(
            resolver(Some(VAULT)),
            FixedCredential("token"),
            InMemoryStore::with("other", "hunter2"),
        );
        let err = retriever.retrieve("secret").await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("SecretNotFound"), "{message}");
        assert!(!message.contains("hunter2"), "{message}");
    }

    #[tokio::test]
    async fn missing_endpoint_skips_credential_and_store() {
        let store = InMemoryStore::with("secret", "hunter2");
        let retriever = SecretRetriever::new(resolver(None), FixedCredential("token"), store);
        let err = retriever.retrieve("secret").await.unwrap_err();
        assert!(matches!(err, RetrievalError::MissingEndpoint(_)));
        assert_eq!(retriever.store.fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn credential_failure_is_reported() {
        let retriever = SecretRetriever::new(
            resolver(Some(VAULT)),
            NoCredential,
            InMemoryStore::with("secret", "hunter2"),
        );
        let err = retriever.retrieve("secret").await.unwrap_err();
        assert!(matches!(err, RetrievalError::Credential(_)));
        assert!(err.to_string().contains("managed identity"));
    }

    #[tokio::test]
    async fn wrong_credential_is_rejected_by_store() {
        let retriever = SecretRetriever::new(
            resolver(Some(VAULT)),
            FixedCredential("expired"),
            InMemoryStore::with("secret", "hunter2"),
        );
        let err = retriever.retrieve("secret").await.unwrap_err();
        assert!(err.to_string().contains("401 Unauthorized"));
    }

    #[tokio::test]
    async fn every_retrieval_fetches_again() {
        let retriever = SecretRetriever::new(
            resolver(Some(VAULT)),
            FixedCredential("token"),
            InMemoryStore::with("secret", "hunter2"),
        );
        retriever.retrieve("secret").await.unwrap();
        retriever.retrieve("secret").await.unwrap();
        assert_eq!(retriever.store.fetches.load(Ordering::SeqCst), 2);
    }
}
