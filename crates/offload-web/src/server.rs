//! Router assembly and the HTTP listener.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{any, get};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::handlers;
use crate::state::AppState;

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/simple-sleep", get(handlers::simple_sleep))
        // Timing comparison
        .route("/waiting-sequentially", get(handlers::waiting_sequentially))
        .route("/waiting-concurrently", get(handlers::waiting_concurrently))
        // Hello world, blocking and bridged
        .route("/sync-hello-world", get(handlers::sync_hello_world))
        .route("/async-hello-world", get(handlers::async_hello_world))
        // Records
        .route("/sync-list", get(handlers::sync_list))
        .route("/async-list/:sleep", get(handlers::async_list))
        .route("/async-update/:sleep", get(handlers::async_update))
        .route("/async-cbv-detail/:pk/:sleep", any(handlers::async_cbv_detail))
        .route("/async-save/:id/:sleep", get(handlers::async_save))
        // Fan-out only
        .route("/api-calling/:sleep", get(handlers::api_calling))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the router on `addr` until `shutdown` resolves.
pub async fn serve<F>(state: Arc<AppState>, addr: SocketAddr, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "offload server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("offload server stopped");
    Ok(())
}
