//! HTTP surface: dashboard, report queries and group commands.
//!
//! Handlers only read reconciled state; the one write path is publishing
//! group commands to the bus.

mod dashboard;
mod error;
mod groups;
mod reports;

use axum::Router;
use axum::routing::get;
use log::info;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::command::CommandDispatcher;
use crate::error::Result;
use crate::store::Stores;

pub use error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub stores: Stores,
    pub commands: CommandDispatcher,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(dashboard::index))
        .route("/health", get(|| async { "OK" }))
        .route("/reports", get(reports::list_reports))
        .route("/groups", get(groups::list_groups))
        .route("/groupOn", get(groups::group_on))
        .route("/groupOff", get(groups::group_off))
        .with_state(state)
}

/// Serve until `cancel` fires, then finish in-flight requests.
pub async fn serve(bind: SocketAddr, state: AppState, cancel: CancellationToken) -> Result<()> {
    let listener = TcpListener::bind(bind).await?;
    info!("[HTTP] Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await?;

    info!("[HTTP] Server stopped");
    Ok(())
}

#[cfg(test)]
pub(crate) fn test_state_with_bus() -> (
    std::sync::Arc<crate::store::memory::MemoryStore>,
    std::sync::Arc<crate::bus::recording::RecordingBus>,
    AppState,
) {
    use crate::bus::Topics;
    use crate::bus::recording::RecordingBus;
    use crate::store::memory::MemoryStore;
    use std::sync::Arc;

    let store = Arc::new(MemoryStore::new());
    let bus = Arc::new(RecordingBus::new());
    let state = AppState {
        stores: Stores::from_backend(store.clone()),
        commands: CommandDispatcher::new(bus.clone(), Topics::new("zigbee2mqtt")),
    };
    (store, bus, state)
}

#[cfg(test)]
pub(crate) fn test_state() -> (std::sync::Arc<crate::store::memory::MemoryStore>, AppState) {
    let (store, _bus, state) = test_state_with_bus();
    (store, state)
}
