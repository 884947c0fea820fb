//! The PerkPass node: owns the store, the terminal registry and the
//! background tasks, and wires them to the HTTP API.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use perkpass_redemption::{Stores, TerminalRegistry};
use perkpass_rpc::{EventSink, NoopEventSink, RpcServer, RpcState};
use perkpass_store_lmdb::LmdbEnvironment;
use perkpass_types::{Clock, SystemClock, Timestamp};

use crate::config::NodeConfig;
use crate::error::NodeError;
use crate::metrics::RedemptionMetrics;
use crate::shutdown::ShutdownController;
use crate::sweeper::spawn_sweeper;

/// Timeout for waiting on background tasks during shutdown.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

pub struct PerkPassNode {
    pub config: NodeConfig,
    env: LmdbEnvironment,
    pub stores: Stores,
    pub terminals: Arc<TerminalRegistry>,
    clock: Arc<dyn Clock>,
    pub metrics: Option<Arc<RedemptionMetrics>>,
    pub shutdown: Arc<ShutdownController>,
    started_at: Timestamp,
    task_handles: Vec<JoinHandle<()>>,
}

impl PerkPassNode {
    /// Open the LMDB environment under `config.data_dir` and build the
    /// terminal registry on the system clock.
    pub fn new(config: NodeConfig) -> Result<Self, NodeError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: NodeConfig, clock: Arc<dyn Clock>) -> Result<Self, NodeError> {
        config.validate()?;
        let env = LmdbEnvironment::open(&config.data_dir, config.map_size_bytes())?;
        let stores = Stores {
            members: Arc::new(env.membership_store()),
            benefits: Arc::new(env.benefit_store()),
            redemptions: Arc::new(env.redemption_store()),
        };
        let terminals = Arc::new(TerminalRegistry::new(
            stores.clone(),
            Arc::clone(&clock),
            config.params.clone(),
        ));
        let metrics = if config.enable_metrics {
            Some(Arc::new(RedemptionMetrics::new()?))
        } else {
            None
        };

        Ok(Self {
            config,
            env,
            stores,
            terminals,
            started_at: clock.now(),
            clock,
            metrics,
            shutdown: Arc::new(ShutdownController::new()),
            task_handles: Vec::new(),
        })
    }

    pub fn environment(&self) -> &LmdbEnvironment {
        &self.env
    }

    /// State shared with the HTTP handlers.
    pub fn rpc_state(&self) -> Arc<RpcState> {
        let events: Arc<dyn EventSink> = match &self.metrics {
            Some(metrics) => Arc::clone(metrics) as Arc<dyn EventSink>,
            None => Arc::new(NoopEventSink),
        };
        Arc::new(RpcState {
            started_at: self.started_at,
            clock: Arc::clone(&self.clock),
            terminals: Arc::clone(&self.terminals),
            redemptions: Arc::clone(&self.stores.redemptions),
            metrics_registry: self.metrics.as_ref().map(|m| m.registry.clone()),
            events,
        })
    }

    /// Spawn the sweeper and, if enabled, the HTTP server.
    pub fn launch(&mut self) {
        let sweeper = spawn_sweeper(
            Arc::clone(&self.terminals),
            Arc::clone(&self.clock),
            self.metrics.clone(),
            Duration::from_secs(self.config.sweep_interval_secs),
            self.shutdown.subscribe(),
        );
        self.task_handles.push(sweeper);

        if self.config.enable_rpc {
            let rpc_server = RpcServer::with_state(self.config.rpc_port, self.rpc_state());
            let mut shutdown_rx_rpc = self.shutdown.subscribe();

            let rpc_handle = tokio::spawn(async move {
                tokio::select! {
                    biased;
                    _ = shutdown_rx_rpc.recv() => {
                        tracing::info!("RPC server shutting down");
                    }
                    result = rpc_server.start() => {
                        match result {
                            Ok(()) => tracing::info!("RPC server exited"),
                            Err(e) => tracing::error!("RPC server error: {e}"),
                        }
                    }
                }
            });
            self.task_handles.push(rpc_handle);
        }

        tracing::info!(
            data_dir = %self.config.data_dir.display(),
            rpc = self.config.enable_rpc,
            rpc_port = self.config.rpc_port,
            metrics = self.metrics.is_some(),
            window_secs = self.config.params.duplicate_window_secs,
            "PerkPass node started"
        );
    }

    /// Launch, then block until SIGINT or SIGTERM.
    pub async fn start(&mut self) -> Result<(), NodeError> {
        self.launch();
        self.shutdown.wait_for_signal().await;
        Ok(())
    }

    /// Stop background tasks and flush LMDB.
    pub async fn stop(&mut self) -> Result<(), NodeError> {
        tracing::info!("PerkPass node stopping");
        self.shutdown.shutdown();

        let handles: Vec<JoinHandle<()>> = self.task_handles.drain(..).collect();
        let wait_all = async {
            for handle in handles {
                let _ = handle.await;
            }
        };
        if tokio::time::timeout(SHUTDOWN_TIMEOUT, wait_all)
            .await
            .is_err()
        {
            tracing::warn!(
                "shutdown timeout ({:?}), some tasks may still be running",
                SHUTDOWN_TIMEOUT
            );
        }

        self.env.sync()?;
        tracing::info!("PerkPass node stopped");
        Ok(())
    }
}
