//! HTTP API for the PerkPass node.
//!
//! Provides endpoints for:
//! - Terminal registration and the submit / confirm / cancel flow
//! - Terminal state inspection
//! - Redemption history per business and per member
//! - Prometheus metrics

pub mod error;
pub mod handlers;
pub mod pagination;
pub mod server;

pub use error::RpcError;
pub use server::{router, EventSink, NoopEventSink, RpcServer, RpcState};
