use anyhow::Result;
use apkwatch::cli::{run, Cli};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // BOT_TOKEN, CHANNEL_ID and MESSAGE_ID may come from a local .env
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "apkwatch starting: tracing initialised, .env loaded"
    );

    let cli = Cli::parse();
    let result = run(cli).await;
    match &result {
        Ok(_) => tracing::info!("apkwatch finished"),
        Err(e) => tracing::error!(error = %e, "apkwatch exited with error"),
    }
    result
}
