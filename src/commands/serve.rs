use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use kvweb_http::{CliArgs, HomeController, HttpServer};
use kvweb_secrets::{
    AzureAuthorityHost, AzureCredentialProvider, AzureKeyVaultAuthOptions, AzureKeyVaultConfig,
    AzureKeyVaultStore, AzureSecretRetriever, EndpointResolver, KEY_VAULT_URI,
};

/// Serve the Home, About and Contact pages.
#[derive(Parser, Debug)]
#[clap(about = "Serve the web front end")]
pub struct ServeCommand {
    #[clap(flatten)]
    pub http: CliArgs,

    /// A dotenv file consulted for KEY_VAULT_URI when it is not set in the environment.
    #[clap(long = "dotenv", env = "KVWEB_DOTENV", default_value = ".env")]
    pub dotenv_path: PathBuf,

    /// Do not consult a dotenv file.
    #[clap(long = "no-dotenv")]
    pub no_dotenv: bool,

    /// Client ID of a service principal used to authenticate to Key Vault.
    /// When no service principal is given, ambient credentials (environment,
    /// managed identity, workload identity, Azure CLI) are used.
    #[clap(long, env = "KVWEB_AZURE_CLIENT_ID", requires_all = &["client-secret", "tenant-id"])]
    pub client_id: Option<String>,

    /// Client secret of the service principal.
    #[clap(long, env = "KVWEB_AZURE_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// Tenant ID of the service principal.
    #[clap(long, env = "KVWEB_AZURE_TENANT_ID")]
    pub tenant_id: Option<String>,

    /// Authority host of the service principal: public, china, germany or government.
    #[clap(long, env = "KVWEB_AZURE_AUTHORITY_HOST", value_parser = parse_authority_host)]
    pub authority_host: Option<AzureAuthorityHost>,
}

impl ServeCommand {
    pub async fn run(self) -> Result<()> {
        let auth_options = AzureKeyVaultAuthOptions::try_from(self.azure_config())
            .context("Invalid Azure Key Vault authentication settings")?;
        tracing::info!(?auth_options, "Configured Azure Key Vault authentication");

        let resolver = EndpointResolver::from_env(self.dotenv());
        match resolver.resolve() {
            Ok(endpoint) => tracing::info!(%endpoint, "Resolved vault endpoint"),
            // Resolution is retried on every request, so a missing endpoint is not fatal.
            Err(err) => tracing::warn!("{KEY_VAULT_URI} is not usable yet: {err}"),
        }

        let retriever = AzureSecretRetriever::new(
            resolver,
            AzureCredentialProvider::new(auth_options),
            AzureKeyVaultStore,
        );
        let controller = HomeController::new(Arc::new(retriever));

        let listen_addr = self.http.address;
        let tls_config = self.http.into_tls_config();
        let server = Arc::new(HttpServer::new(listen_addr, tls_config, controller)?);
        server.serve(shutdown_signal()).await
    }

    fn azure_config(&self) -> AzureKeyVaultConfig {
        AzureKeyVaultConfig {
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            tenant_id: self.tenant_id.clone(),
            authority_host: self.authority_host,
        }
    }

    fn dotenv(&self) -> Option<PathBuf> {
        (!self.no_dotenv).then(|| self.dotenv_path.clone())
    }
}

fn parse_authority_host(value: &str) -> Result<AzureAuthorityHost> {
    value.parse()
}

/// Completes on Ctrl-C.
async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Unable to listen for Ctrl-C; graceful shutdown is disabled: {err}");
        std::future::pending::<()>().await;
    }
}
