// src/main.rs

use std::path::PathBuf;

use anyhow::Result;
use livecap_config::{ConfigLoader, LivecapConfig};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use livecap::LivecapApp;

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    info!("Starting livecap v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config()?;
    config.validate()?;

    let app = LivecapApp::new(config)?;
    app.run().await?;

    info!("livecap shut down successfully");
    Ok(())
}

fn init_logging() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "livecap=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    Ok(())
}

fn load_config() -> Result<LivecapConfig> {
    let path = std::env::var("LIVECAP_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("livecap.toml"));

    Ok(ConfigLoader::load(Some(&path))?)
}
