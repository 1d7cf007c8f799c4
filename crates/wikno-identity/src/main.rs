//! CLI entry point for the wikno-identity service.

use clap::Parser;

use wikno_core::config::load_config;
use wikno_core::telemetry::init_tracing;
use wikno_identity::{IdentityApp, IdentityConfig};
use wikno_rpc::shutdown_signal;

#[derive(Parser)]
#[command(name = "wikno-identity")]
#[command(about = "Identity service: registration, login and token verification")]
struct Cli {
    /// Config file prefix (default: wikno-identity).
    #[arg(short, long, default_value = "wikno-identity")]
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config: IdentityConfig = load_config(&cli.config, "WIKNO_IDENTITY")?;
    config.validate()?;
    init_tracing(&config.log);

    let app = IdentityApp::build(&config).await?;
    let listener = config.server.bind().await?;

    app.serve(listener, shutdown_signal()).await?;
    tracing::info!("Identity service stopped");
    Ok(())
}
