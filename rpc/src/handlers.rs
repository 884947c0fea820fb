//! HTTP request handlers.
//!
//! Terminal calls and store reads are synchronous, so they run on the
//! blocking pool. Protocol outcomes are always `200` with a structured body;
//! only misuse and infrastructure failures map to error statuses.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};

use perkpass_redemption::{
    lock_terminal, CancelCause, OrchestratorState, RedemptionOrchestrator, RedemptionResult,
    TerminalHandle, VerificationResult,
};
use perkpass_types::{BenefitId, BusinessId, Clock, MemberId, Redemption, Timestamp};

use crate::error::RpcError;
use crate::pagination::{decode_cursor, effective_count, paginate, Page};
use crate::server::RpcState;

// ── Terminals ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RegisterTerminalRequest {
    pub terminal_id: String,
    pub business_id: String,
}

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub code: String,
    #[serde(default)]
    pub benefit_id: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct PendingView {
    pub member_id: String,
    pub member_name: String,
    pub benefit_id: u64,
    pub benefit: String,
    pub discount_percent: u8,
    /// Unix seconds after which the scan is auto-cancelled.
    pub confirm_by: u64,
}

#[derive(Debug, Serialize)]
pub struct TerminalStateResponse {
    pub terminal_id: String,
    pub business_id: String,
    pub state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending: Option<PendingView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redemption: Option<Redemption>,
}

/// Snapshot a terminal, applying the confirmation timeout first.
pub fn describe(terminal: &mut RedemptionOrchestrator) -> TerminalStateResponse {
    let state = terminal.state().clone();
    let mut response = TerminalStateResponse {
        terminal_id: terminal.terminal_id().to_string(),
        business_id: terminal.business_id().to_string(),
        state: state.label(),
        reason: None,
        pending: None,
        redemption: None,
    };
    match state {
        OrchestratorState::AwaitingConfirmation(p) => {
            response.pending = Some(PendingView {
                member_id: p.member.id.to_string(),
                member_name: p.member.name,
                benefit_id: p.benefit.id.get(),
                benefit: p.benefit.description,
                discount_percent: p.benefit.discount_percent,
                confirm_by: terminal
                    .confirmation_deadline()
                    .map(|t| t.as_secs())
                    .unwrap_or_default(),
            });
        }
        OrchestratorState::Rejected(reason) => response.reason = Some(reason.to_string()),
        OrchestratorState::Cancelled(cause) => {
            response.reason = Some(
                match cause {
                    CancelCause::Operator => "cancelled by operator",
                    CancelCause::Timeout => "confirmation timed out",
                }
                .to_string(),
            )
        }
        OrchestratorState::Done(redemption) => response.redemption = Some(redemption),
        _ => {}
    }
    response
}

async fn run_on_handle<T, F>(
    state: &RpcState,
    terminal_id: &str,
    handle: TerminalHandle,
    op: F,
) -> Result<T, RpcError>
where
    F: FnOnce(&mut RedemptionOrchestrator) -> T + Send + 'static,
    T: Send + 'static,
{
    let (output, events) = tokio::task::spawn_blocking(move || {
        let mut terminal = lock_terminal(&handle);
        let output = op(&mut terminal);
        (output, terminal.drain_events())
    })
    .await
    .map_err(|e| RpcError::Server(format!("terminal task failed: {e}")))?;

    if !events.is_empty() {
        state.events.record_events(terminal_id, &events);
    }
    Ok(output)
}

async fn run_on_terminal<T, F>(state: &RpcState, terminal_id: &str, op: F) -> Result<T, RpcError>
where
    F: FnOnce(&mut RedemptionOrchestrator) -> T + Send + 'static,
    T: Send + 'static,
{
    let handle = state
        .terminals
        .get(terminal_id)
        .ok_or_else(|| RpcError::TerminalNotFound(terminal_id.to_string()))?;
    run_on_handle(state, terminal_id, handle, op).await
}

pub async fn register_terminal(
    State(state): State<Arc<RpcState>>,
    Json(req): Json<RegisterTerminalRequest>,
) -> Result<(StatusCode, Json<TerminalStateResponse>), RpcError> {
    let business: BusinessId = req
        .business_id
        .parse()
        .map_err(|e: perkpass_types::TypesError| RpcError::InvalidRequest(e.to_string()))?;
    let registry = Arc::clone(&state.terminals);
    let terminal_id = req.terminal_id.clone();
    let handle = tokio::task::spawn_blocking(move || registry.register(&terminal_id, business))
        .await
        .map_err(|e| RpcError::Server(format!("terminal task failed: {e}")))??;
    let view = run_on_handle(&state, &req.terminal_id, handle, describe).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn terminal_state(
    State(state): State<Arc<RpcState>>,
    Path(id): Path<String>,
) -> Result<Json<TerminalStateResponse>, RpcError> {
    Ok(Json(run_on_terminal(&state, &id, describe).await?))
}

pub async fn remove_terminal(
    State(state): State<Arc<RpcState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, RpcError> {
    if state.terminals.remove(&id) {
        tracing::info!(terminal = %id, "terminal removed");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(RpcError::TerminalNotFound(id))
    }
}

pub async fn submit(
    State(state): State<Arc<RpcState>>,
    Path(id): Path<String>,
    Json(req): Json<SubmitRequest>,
) -> Result<Json<VerificationResult>, RpcError> {
    let result = run_on_terminal(&state, &id, move |terminal| match req.benefit_id {
        Some(benefit) => terminal.submit_with_benefit(&req.code, BenefitId::new(benefit)),
        None => terminal.submit(&req.code),
    })
    .await??;
    Ok(Json(result))
}

pub async fn confirm(
    State(state): State<Arc<RpcState>>,
    Path(id): Path<String>,
) -> Result<Json<RedemptionResult>, RpcError> {
    let result = run_on_terminal(&state, &id, |terminal| terminal.confirm()).await??;
    Ok(Json(result))
}

pub async fn cancel(
    State(state): State<Arc<RpcState>>,
    Path(id): Path<String>,
) -> Result<Json<TerminalStateResponse>, RpcError> {
    let view = run_on_terminal(&state, &id, |terminal| {
        terminal.cancel().map(|()| describe(terminal))
    })
    .await??;
    Ok(Json(view))
}

pub async fn dismiss(
    State(state): State<Arc<RpcState>>,
    Path(id): Path<String>,
) -> Result<Json<TerminalStateResponse>, RpcError> {
    let view = run_on_terminal(&state, &id, |terminal| {
        terminal.dismiss().map(|()| describe(terminal))
    })
    .await??;
    Ok(Json(view))
}

// ── Redemption history ───────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Unix seconds; only redemptions at or after this instant.
    pub since: Option<u64>,
    pub cursor: Option<String>,
    pub count: Option<u32>,
}

impl ListQuery {
    fn offset(&self) -> Result<u64, RpcError> {
        match self.cursor.as_deref() {
            None => Ok(0),
            Some(c) => decode_cursor(c)
                .ok_or_else(|| RpcError::InvalidRequest(format!("invalid cursor {c:?}"))),
        }
    }

    fn since(&self) -> Timestamp {
        Timestamp::new(self.since.unwrap_or(0))
    }
}

async fn blocking_read<T, F>(read: F) -> Result<T, RpcError>
where
    F: FnOnce() -> Result<T, perkpass_store::StoreError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(read)
        .await
        .map_err(|e| RpcError::Server(format!("store task failed: {e}")))?
        .map_err(RpcError::from)
}

pub async fn business_redemptions(
    State(state): State<Arc<RpcState>>,
    Path(id): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Page<Redemption>>, RpcError> {
    let business: BusinessId = id
        .parse()
        .map_err(|e: perkpass_types::TypesError| RpcError::InvalidRequest(e.to_string()))?;
    let offset = query.offset()?;
    let since = query.since();
    let store = Arc::clone(&state.redemptions);
    let records =
        blocking_read(move || store.list_redemptions_by_business(&business, since)).await?;
    Ok(Json(paginate(records, offset, effective_count(query.count))))
}

pub async fn member_redemptions(
    State(state): State<Arc<RpcState>>,
    Path(id): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Page<Redemption>>, RpcError> {
    let member: MemberId = id
        .parse()
        .map_err(|e: perkpass_types::TypesError| RpcError::InvalidRequest(e.to_string()))?;
    let offset = query.offset()?;
    let since = query.since();
    let store = Arc::clone(&state.redemptions);
    let records = blocking_read(move || store.list_by_member(&member)).await?;
    let records = records.into_iter().filter(|r| r.used_at >= since).collect();
    Ok(Json(paginate(records, offset, effective_count(query.count))))
}

// ── Telemetry ────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub uptime_secs: u64,
    pub terminals: usize,
    pub awaiting_confirmation: usize,
}

pub async fn status(State(state): State<Arc<RpcState>>) -> Result<Json<StatusResponse>, RpcError> {
    let registry = Arc::clone(&state.terminals);
    let (terminals, awaiting) =
        tokio::task::spawn_blocking(move || (registry.len(), registry.awaiting_count()))
            .await
            .map_err(|e| RpcError::Server(e.to_string()))?;
    Ok(Json(StatusResponse {
        uptime_secs: state.started_at.elapsed_since(state.clock.now()),
        terminals,
        awaiting_confirmation: awaiting,
    }))
}

pub async fn metrics(State(state): State<Arc<RpcState>>) -> Result<Response, RpcError> {
    let registry = state
        .metrics_registry
        .as_ref()
        .ok_or(RpcError::MetricsDisabled)?;
    let encoder = TextEncoder::new();
    let mut buf = Vec::new();
    encoder
        .encode(&registry.gather(), &mut buf)
        .map_err(|e| RpcError::Server(e.to_string()))?;
    Ok(([(header::CONTENT_TYPE, encoder.format_type().to_string())], buf).into_response())
}
