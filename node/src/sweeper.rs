//! Periodic expiry of abandoned confirmations.
//!
//! Orchestrators apply the confirmation timeout lazily whenever they are
//! touched. The sweeper applies it eagerly so a terminal that nobody polls
//! still drops its pending scan and the awaiting gauge stays accurate.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use perkpass_redemption::{RedemptionEvent, TerminalRegistry};
use perkpass_types::Clock;

use crate::metrics::RedemptionMetrics;

/// One pass over every terminal. Returns the events produced.
pub fn sweep_once(
    terminals: &TerminalRegistry,
    clock: &dyn Clock,
    metrics: Option<&RedemptionMetrics>,
) -> Vec<RedemptionEvent> {
    let events = terminals.expire_pending(clock.now());
    if let Some(metrics) = metrics {
        metrics.record(&events);
        metrics
            .terminals_awaiting
            .set(terminals.awaiting_count() as i64);
    }
    if !events.is_empty() {
        tracing::info!(expired = events.len(), "swept timed-out confirmations");
    }
    events
}

/// Spawn the sweeper loop. It exits when `shutdown_rx` fires.
pub fn spawn_sweeper(
    terminals: Arc<TerminalRegistry>,
    clock: Arc<dyn Clock>,
    metrics: Option<Arc<RedemptionMetrics>>,
    interval: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(interval);
        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => {
                    tracing::info!("confirmation sweeper shutting down");
                    break;
                }
                _ = interval.tick() => {
                    let terminals = Arc::clone(&terminals);
                    let clock = Arc::clone(&clock);
                    let metrics = metrics.clone();
                    let swept = tokio::task::spawn_blocking(move || {
                        sweep_once(&terminals, clock.as_ref(), metrics.as_deref());
                    })
                    .await;
                    if let Err(e) = swept {
                        tracing::warn!("confirmation sweep failed: {e}");
                    }
                }
            }
        }
    })
}
