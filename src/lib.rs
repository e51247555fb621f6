pub mod commands;

use anyhow::Result;
use clap::Parser;

use crate::commands::serve::ServeCommand;

/// The Key Vault web front end.
#[derive(Parser, Debug)]
#[clap(name = "keyvault-web", version)]
pub enum KeyVaultWebApp {
    Serve(ServeCommand),
}

impl KeyVaultWebApp {
    /// The main entry point to the CLI.
    pub async fn run(self) -> Result<()> {
        match self {
            Self::Serve(cmd) => cmd.run().await,
        }
    }
}
