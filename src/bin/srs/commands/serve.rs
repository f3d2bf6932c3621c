use std::sync::Arc;

use anyhow::{Context, Result};

use srs_cards::server::start_server;
use srs_cards::{CardStore, ServerConfig};

pub async fn run(config: ServerConfig) -> Result<()> {
    let store = match &config.data_file {
        Some(path) => CardStore::open(path.clone())
            .with_context(|| format!("Failed to open card snapshot {:?}", path))?,
        None => {
            log::warn!("No data_file configured; cards are kept in memory only");
            CardStore::in_memory()
        }
    };

    let server = start_server(&config, Arc::new(store)).await?;
    println!("Listening on {}", server.base_url());

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    server.shutdown().await;

    Ok(())
}
