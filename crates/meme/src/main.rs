//! `meme-server`: the meme tool set served over MCP on stdio.
//!
//! stdout carries the protocol, so all logging goes to stderr.

use meme::{MemeClient, MemeConfig, MemeTools};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const SERVER_NAME: &str = "meme_generator";

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "meme-server failed");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = MemeConfig::from_env();
    if config.api_key.is_none() {
        tracing::warn!("RAPID_API_KEY is not set; meme requests will fail");
    }
    tracing::info!(output_dir = %config.output_dir.display(), "starting meme server");

    let tools = MemeTools::new(MemeClient::new(config)?);
    mcp::serve(
        &tools,
        mcp::Implementation::new(SERVER_NAME, env!("CARGO_PKG_VERSION")),
        tokio::io::stdin(),
        tokio::io::stdout(),
    )
    .await?;

    Ok(())
}
