//! `offload serve`: run the HTTP handlers.

use std::sync::Arc;

use anyhow::Result;
use offload_core::Bridge;
use offload_web::{open_store, AppState};
use tracing::{info, warn};

use crate::config::AppConfig;

pub async fn run(config: AppConfig) -> Result<()> {
    let bridge = Bridge::from_config(&config.bridge);

    let web = config.web.clone();
    let store = bridge.run_blocking(move || open_store(&web)).await?;
    info!(
        database = ?config.web.database,
        max_workers = config.bridge.max_workers,
        "record store ready"
    );

    let state = Arc::new(AppState::new(bridge.clone(), &config.batch, &config.web, store));
    offload_web::serve(state, config.web.socket_addr(), shutdown_signal()).await?;

    bridge.shutdown();
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("ctrl-c received, shutting down"),
        Err(e) => {
            warn!(error = %e, "cannot listen for ctrl-c; serving until killed");
            std::future::pending::<()>().await;
        }
    }
}
