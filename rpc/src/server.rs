//! Axum-based HTTP server.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use perkpass_redemption::{RedemptionEvent, TerminalRegistry};
use perkpass_store::RedemptionStore;
use perkpass_types::{Clock, Timestamp};

use crate::error::RpcError;
use crate::handlers;

/// Receives the events each terminal call produced. Implemented by the node
/// to feed its metrics without the RPC crate depending on it.
pub trait EventSink: Send + Sync {
    fn record_events(&self, terminal: &str, events: &[RedemptionEvent]);
}

/// Discards events.
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn record_events(&self, _terminal: &str, _events: &[RedemptionEvent]) {}
}

/// Shared state for all handlers.
pub struct RpcState {
    pub started_at: Timestamp,
    /// Time source for uptime; the same clock the terminals run on.
    pub clock: Arc<dyn Clock>,
    pub terminals: Arc<TerminalRegistry>,
    pub redemptions: Arc<dyn RedemptionStore>,
    /// `None` disables `/metrics`.
    pub metrics_registry: Option<prometheus::Registry>,
    pub events: Arc<dyn EventSink>,
}

/// Build the router with every endpoint.
pub fn router(state: Arc<RpcState>) -> Router {
    Router::new()
        .route("/terminals", post(handlers::register_terminal))
        .route(
            "/terminals/:id",
            get(handlers::terminal_state).delete(handlers::remove_terminal),
        )
        .route("/terminals/:id/submit", post(handlers::submit))
        .route("/terminals/:id/confirm", post(handlers::confirm))
        .route("/terminals/:id/cancel", post(handlers::cancel))
        .route("/terminals/:id/dismiss", post(handlers::dismiss))
        .route(
            "/businesses/:id/redemptions",
            get(handlers::business_redemptions),
        )
        .route("/members/:id/redemptions", get(handlers::member_redemptions))
        .route("/status", get(handlers::status))
        .route("/metrics", get(handlers::metrics))
        .with_state(state)
}

pub struct RpcServer {
    pub port: u16,
    pub state: Arc<RpcState>,
}

impl RpcServer {
    pub fn with_state(port: u16, state: Arc<RpcState>) -> Self {
        Self { port, state }
    }

    /// Bind and serve until the task is dropped.
    pub async fn start(&self) -> Result<(), RpcError> {
        let app = router(Arc::clone(&self.state));
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| RpcError::Server(format!("failed to bind {addr}: {e}")))?;
        tracing::info!("RPC server listening on {}", addr);
        axum::serve(listener, app)
            .await
            .map_err(|e| RpcError::Server(e.to_string()))
    }
}
