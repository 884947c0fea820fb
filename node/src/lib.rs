//! PerkPass node.
//!
//! Hosts one redemption orchestrator per registered terminal on top of the
//! LMDB store, expires abandoned confirmations in the background, and
//! serves the HTTP API and Prometheus metrics.

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod node;
pub mod shutdown;
pub mod sweeper;

pub use config::NodeConfig;
pub use error::NodeError;
pub use logging::{init_logging, LogFormat};
pub use metrics::RedemptionMetrics;
pub use node::PerkPassNode;
pub use shutdown::ShutdownController;
pub use sweeper::{spawn_sweeper, sweep_once};
