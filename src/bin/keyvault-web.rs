use clap::Parser;
use keyvault_web::KeyVaultWebApp;

#[tokio::main]
async fn main() {
    if let Err(err) = _main().await {
        eprintln!("Error: {err}");
        print_error_chain(err);
        std::process::exit(1)
    }
}

async fn _main() -> anyhow::Result<()> {
    let _telemetry = kvweb_telemetry::init(env!("CARGO_PKG_VERSION").to_string())?;
    KeyVaultWebApp::parse().run().await
}

fn print_error_chain(err: anyhow::Error) {
    if let Some(cause) = err.source() {
        let is_multiple = cause.source().is_some();
        eprintln!("\nCaused by:");
        for (i, err) in err.chain().skip(1).enumerate() {
            if is_multiple {
                eprintln!("{i:>4}: {}", err)
            } else {
                eprintln!("      {}", err)
            }
        }
    }
}
