//! CLI entry point for the wikno-graph service.

use clap::Parser;

use wikno_core::config::load_config;
use wikno_core::telemetry::init_tracing;
use wikno_graph::{GraphApp, GraphConfig};
use wikno_rpc::shutdown_signal;

#[derive(Parser)]
#[command(name = "wikno-graph")]
#[command(about = "Graph service: shared catalog with per-tenant overlays")]
struct Cli {
    /// Config file prefix (default: wikno-graph).
    #[arg(short, long, default_value = "wikno-graph")]
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config: GraphConfig = load_config(&cli.config, "WIKNO_GRAPH")?;
    config.validate()?;
    init_tracing(&config.log);

    let app = GraphApp::build(&config).await?;
    let listener = config.server.bind().await?;

    app.serve(listener, shutdown_signal()).await?;
    tracing::info!("Graph service stopped");
    Ok(())
}
