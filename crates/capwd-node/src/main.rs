use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::UnixListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use capwd::{Broker, FileSource};
use capwd_node::{NodeConfig, Server};

#[derive(Parser, Debug)]
#[command(name = "capwd-node")]
#[command(about = "Serves restricted passwd channels over a unix socket")]
struct Args {
    /// TOML config file. Built-in defaults apply when omitted.
    #[arg(long, env = "CAPWD_CONFIG")]
    config: Option<String>,

    /// Socket path, overriding the config file.
    #[arg(long, env = "CAPWD_SOCKET")]
    socket: Option<String>,

    /// passwd file, overriding the config file.
    #[arg(long, env = "CAPWD_SOURCE")]
    source: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("capwd=info,capwd_node=info")),
        )
        .json()
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => {
            NodeConfig::load(path).with_context(|| format!("Failed to load config from {path}"))?
        }
        None => NodeConfig::default(),
    };
    if let Some(socket) = args.socket {
        config.socket_path = socket;
    }
    if let Some(source) = args.source {
        config.source.path = source;
    }
    let initial = config.initial_state()?;

    let source_path = config.source_path();
    let source = FileSource::open(&source_path)
        .with_context(|| format!("Failed to read passwd records from {}", source_path.display()))?;
    info!(
        path = %source_path.display(),
        records = source.records().len(),
        "passwd source loaded"
    );
    let broker = Arc::new(Broker::with_source(source));

    let socket_path = config.socket_path();
    if socket_path.exists() {
        std::fs::remove_file(&socket_path)
            .with_context(|| format!("Failed to remove stale socket {}", socket_path.display()))?;
    }
    let listener = UnixListener::bind(&socket_path)
        .with_context(|| format!("Failed to bind {}", socket_path.display()))?;
    info!(socket = %socket_path.display(), "capwd-node listening");

    let server = Server::start(listener, broker, initial);
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;
    server.shutdown().await;

    std::fs::remove_file(&socket_path)
        .with_context(|| format!("Failed to remove socket {}", socket_path.display()))?;
    Ok(())
}
