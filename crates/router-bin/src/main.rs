use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use router_lib::{api, config::Settings, AppState};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Meeting router: keeps every meeting on the backend server that owns it
#[derive(Parser, Debug)]
#[command(name = "meeting-router", version, about)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listen address
    #[arg(short, long)]
    bind: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize configuration
    let mut settings = match &args.config {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load()?,
    };
    if let Some(bind) = args.bind {
        settings.bind_addr = bind;
    }

    // Initialize tracing; RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.log_level.as_str()));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .init();

    if settings.servers.is_empty() {
        tracing::warn!("no backend servers configured, create calls will fail");
    }

    let addr = settings.bind_addr;
    let state = Arc::new(AppState::from_settings(settings)?);
    let app = api::create_router(state);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "meeting-router listening");

    axum::serve(listener, app).await?;

    Ok(())
}
