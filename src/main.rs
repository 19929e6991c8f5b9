//! `cachesim` — discrete-event simulator of a distributed caching fabric.
//!
//! `SimConfig` already derives `Parser`, so it is flattened straight into
//! the CLI; `--once` picks between a single completed run printed to
//! stdout and the HTTP control plane.

use anyhow::Result;
use clap::Parser;
use tokio::sync::broadcast;
use tracing::info;

use cachesim::config::SimConfig;
use cachesim::driver::{self, StopSignal};
use cachesim::server;

#[derive(Parser)]
#[command(name = "cachesim", version, about = "Discrete-event simulator of a distributed caching fabric")]
struct Cli {
    #[command(flatten)]
    config: SimConfig,

    /// Run one simulation to completion and print its final metrics as
    /// JSON, instead of starting the HTTP control plane.
    #[arg(long)]
    once: bool,

    /// Address the control plane binds to when `--once` is not set.
    #[arg(long, default_value = "127.0.0.1:8080")]
    bind: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive("cachesim=info".parse()?))
        .init();

    let cli = Cli::parse();

    if cli.once {
        cli.config.validate()?;
        info!(nodes = cli.config.nodes, duration = cli.config.duration, "running one simulation to completion");
        let (tx, _rx) = broadcast::channel(1024);
        let metrics = driver::run(cli.config, StopSignal::new(), tx).await?;
        println!("{}", serde_json::to_string_pretty(&metrics)?);
        return Ok(());
    }

    let addr: std::net::SocketAddr = cli.bind.parse()?;
    let (sink, _rx) = broadcast::channel(1024);
    let router = server::create_router(sink);
    let (listener, actual) = server::bind(addr).await?;
    info!(addr = %actual, "cachesim control plane listening");
    server::serve(listener, router).await?;

    Ok(())
}
