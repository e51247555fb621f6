use std::{fmt, str::FromStr, sync::Arc};

use async_trait::async_trait;
use azure_core::{auth::TokenCredential, Url};
use azure_security_keyvault::SecretClient;
use tracing::{instrument, Level};

use crate::{CredentialProvider, RetrievalError, SecretStore, SecretRetriever, VaultEndpoint};

/// The credential handed from [`AzureCredentialProvider`] to [`AzureKeyVaultStore`].
pub type AzureCredential = Arc<dyn TokenCredential>;

/// A retriever that reads secrets from Azure Key Vault.
pub type AzureSecretRetriever = SecretRetriever<AzureCredentialProvider, AzureKeyVaultStore>;

/// Azure Key Vault authentication settings.
///
/// The service principal fields are optional. When none of them are set the
/// ambient credential chain is used instead.
#[derive(Clone, Default)]
pub struct AzureKeyVaultConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub tenant_id: Option<String>,
    pub authority_host: Option<AzureAuthorityHost>,
}

impl fmt::Debug for AzureKeyVaultConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AzureKeyVaultConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .field("tenant_id", &self.tenant_id)
            .field("authority_host", &self.authority_host)
            .finish()
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum AzureAuthorityHost {
    #[default]
    AzurePublicCloud,
    AzureChina,
    AzureGermany,
    AzureGovernment,
}

impl FromStr for AzureAuthorityHost {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "azurepubliccloud" | "public" => Ok(Self::AzurePublicCloud),
            "azurechina" | "china" => Ok(Self::AzureChina),
            "azuregermany" | "germany" => Ok(Self::AzureGermany),
            "azuregovernment" | "government" => Ok(Self::AzureGovernment),
            _ => anyhow::bail!(
                "unknown authority host {s:?}; expected one of AzurePublicCloud, AzureChina, AzureGermany, AzureGovernment"
            ),
        }
    }
}

impl From<AzureAuthorityHost> for Url {
    fn from(value: AzureAuthorityHost) -> Self {
        let url = match value {
            AzureAuthorityHost::AzureChina => "https://login.chinacloudapi.cn/",
            AzureAuthorityHost::AzureGovernment => "https://login.microsoftonline.us/",
            AzureAuthorityHost::AzureGermany => "https://login.microsoftonline.de/",
            AzureAuthorityHost::AzurePublicCloud => "https://login.microsoftonline.com/",
        };
        Url::parse(url).expect("authority host URLs are valid")
    }
}

/// How to authenticate to Azure Key Vault.
#[derive(Clone)]
pub enum AzureKeyVaultAuthOptions {
    /// A service principal with a client secret.
    ServicePrincipal {
        client_id: String,
        client_secret: String,
        tenant_id: String,
        authority_host: AzureAuthorityHost,
    },
    /// Ambient credentials resolved by the Azure SDK's default credential chain:
    /// `AZURE_TENANT_ID`/`AZURE_CLIENT_ID`/`AZURE_CLIENT_SECRET` (or a client
    /// certificate), workload identity (`AZURE_FEDERATED_TOKEN_FILE`), managed
    /// identity, and finally the Azure CLI.
    Environmental,
}

impl fmt::Debug for AzureKeyVaultAuthOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ServicePrincipal {
                client_id,
                tenant_id,
                authority_host,
                ..
            } => f
                .debug_struct("ServicePrincipal")
                .field("client_id", client_id)
                .field("client_secret", &"<redacted>")
                .field("tenant_id", tenant_id)
                .field("authority_host", authority_host)
                .finish(),
            Self::Environmental => f.write_str("Environmental"),
        }
    }
}

impl TryFrom<AzureKeyVaultConfig> for AzureKeyVaultAuthOptions {
    type Error = anyhow::Error;

    fn try_from(value: AzureKeyVaultConfig) -> Result<Self, Self::Error> {
        match (value.client_id, value.tenant_id, value.client_secret) {
            (Some(client_id), Some(tenant_id), Some(client_secret)) => {
                Ok(AzureKeyVaultAuthOptions::ServicePrincipal {
                    client_id,
                    client_secret,
                    tenant_id,
                    authority_host: value.authority_host.unwrap_or_default(),
                })
            }
            (None, None, None) => Ok(AzureKeyVaultAuthOptions::Environmental),
            _ => anyhow::bail!("Some but not all of the Azure Key Vault 'client_id', 'client_secret', and 'tenant_id' values were given. Provide the missing values to authenticate with a service principal, or remove all of them to use ambient authentication (e.g. env vars, Azure CLI, Managed Identity, Workload Identity).")
        }
    }
}

/// A [`CredentialProvider`] backed by the Azure identity SDK.
#[derive(Debug, Clone)]
pub struct AzureCredentialProvider {
    options: AzureKeyVaultAuthOptions,
}

impl AzureCredentialProvider {
    pub fn new(options: AzureKeyVaultAuthOptions) -> Self {
        Self { options }
    }

    /// Uses the ambient credential chain.
    pub fn ambient() -> Self {
        Self::new(AzureKeyVaultAuthOptions::Environmental)
    }
}

impl CredentialProvider for AzureCredentialProvider {
    type Credential = AzureCredential;

    fn credential(&self) -> Result<AzureCredential, RetrievalError> {
        match &self.options {
            AzureKeyVaultAuthOptions::ServicePrincipal {
                client_id,
                client_secret,
                tenant_id,
                authority_host,
            } => {
                let credential = azure_identity::ClientSecretCredential::new(
                    azure_core::new_http_client(),
                    (*authority_host).into(),
                    tenant_id.clone(),
                    client_id.clone(),
                    client_secret.clone(),
                );
                Ok(Arc::new(credential) as AzureCredential)
            }
            AzureKeyVaultAuthOptions::Environmental => azure_identity::create_default_credential()
                .map_err(|err| RetrievalError::Credential(err.into())),
        }
    }
}

/// A [`SecretStore`] that reads from Azure Key Vault.
///
/// A fresh client is built for every fetch.
#[derive(Debug, Default, Clone, Copy)]
pub struct AzureKeyVaultStore;

#[async_trait]
impl SecretStore for AzureKeyVaultStore {
    type Credential = AzureCredential;

    #[instrument(name = "kvweb_secrets.get_from_azure_key_vault", level = Level::DEBUG, skip(self, credential), err(level = Level::INFO), fields(otel.kind = "client", vault.endpoint = %endpoint))]
    async fn fetch_secret(
        &self,
        endpoint: &VaultEndpoint,
        credential: AzureCredential,
        name: &str,
    ) -> Result<String, RetrievalError> {
        let client = SecretClient::new(endpoint.as_str(), credential)
            .map_err(|err| RetrievalError::fetch(name, endpoint, err))?;
        let secret = client
            .get(name)
            .await
            .map_err(|err| RetrievalError::fetch(name, endpoint, err))?;
        Ok(secret.value)
    }
}
