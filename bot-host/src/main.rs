//! Bot host: serves UCI engines over the line-delimited JSON channel protocol.
//!
//! Each client connection gets its own engine processes, one per `connect`, shut down when the
//! client disconnects or hangs up.

mod config;
mod server;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use engine::EngineSpec;
use tokio::net::TcpListener;

#[derive(Parser)]
#[command(name = "bot-host", about = "Serve UCI engines to arbiter clients")]
struct Cli {
    /// Listen address (host:port).
    #[arg(long)]
    addr: Option<String>,

    /// Engine to serve, as `name=path`. Repeatable.
    #[arg(long = "engine", value_parser = config::parse_engine_arg)]
    engines: Vec<(String, EngineSpec)>,

    /// JSON file mapping engine names to executables.
    #[arg(long)]
    engines_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use tracing_subscriber::fmt::format::FmtSpan;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_span_events(FmtSpan::CLOSE)
        .init();

    let cli = Cli::parse();
    let addr = cli.addr.unwrap_or_else(config::get_listen_addr);
    let engines_file = cli.engines_file.or_else(config::get_engines_file);

    let engines = config::resolve_engines(engines_file.as_deref(), &cli.engines)?;
    for (name, spec) in &engines {
        tracing::info!(%name, path = %spec.path().display(), "Engine available");
    }

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Bot host listening on {}", addr);

    tokio::select! {
        result = server::serve(listener, Arc::new(engines)) => result?,
        _ = tokio::signal::ctrl_c() => tracing::info!("Interrupted, shutting down"),
    }
    Ok(())
}
