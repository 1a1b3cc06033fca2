use anyhow::Result;
use axum::Router;
use booksearch_core::popularity::ClickStore;
use clap::Parser;
use server::build_app;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Index directory written by `indexer build`
    #[arg(long, default_value = "./index")]
    index: PathBuf,
    /// Directory for the click-count store
    #[arg(long, default_value = "./data")]
    data: PathBuf,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let clicks = ClickStore::open(args.data.join("clicks"))?;
    let app: Router = build_app(&args.index, clicks.clone())?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, index = %args.index.display(), "server listening");
    axum::serve(listener, app).await?;
    clicks.flush()?;
    Ok(())
}
