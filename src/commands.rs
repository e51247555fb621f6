//! Commands for the keyvault-web CLI.

/// Command for serving the web front end.
pub mod serve;
