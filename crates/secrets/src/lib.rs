//! Secret retrieval for the Key Vault web front end.
//!
//! A retrieval is three steps: resolve the vault endpoint from configuration,
//! obtain a credential from a [`CredentialProvider`], and ask a [`SecretStore`]
//! for the named secret. [`SecretRetriever`] composes the three.

mod azure_key_vault;
mod endpoint;
mod error;
mod retriever;

use std::fmt::Debug;

use async_trait::async_trait;

pub use azure_key_vault::*;
pub use endpoint::*;
pub use error::*;
pub use retriever::*;

/// The name of the secret shown on the index page.
pub const SECRET_NAME: &str = "secret";

/// Acquires credentials for talking to a secret store.
///
/// In production this is ambient (managed identity, environment, CLI) or a
/// configured service principal. Tests substitute a fixed credential or a
/// simulated failure.
pub trait CredentialProvider: Debug + Send + Sync {
    /// The credential handed to the matching [`SecretStore`].
    type Credential: Send + Sync;

    /// Returns a credential, or the reason one could not be acquired.
    fn credential(&self) -> Result<Self::Credential, RetrievalError>;
}

/// A store of named secrets reachable at a [`VaultEndpoint`].
#[async_trait]
pub trait SecretStore: Debug + Send + Sync {
    /// The credential type this store authenticates with.
    type Credential: Send + Sync;

    /// Fetches the current value of the secret `name`.
    async fn fetch_secret(
        &self,
        endpoint: &VaultEndpoint,
        credential: Self::Credential,
        name: &str,
    ) -> Result<String, RetrievalError>;
}
