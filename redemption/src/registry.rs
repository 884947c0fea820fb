//! Terminal registry: one orchestrator per terminal id.
//!
//! Orchestrator calls are synchronous store I/O, so terminals are guarded by
//! `std::sync::Mutex` and meant to be driven from blocking tasks. Poisoned
//! locks are recovered.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use perkpass_types::{BusinessId, Clock, RedemptionParams, Timestamp};

use crate::{RedemptionEvent, RedemptionOrchestrator, RegistryError, Stores};

pub type TerminalHandle = Arc<Mutex<RedemptionOrchestrator>>;

/// Lock one terminal.
pub fn lock_terminal(handle: &TerminalHandle) -> MutexGuard<'_, RedemptionOrchestrator> {
    handle.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct TerminalRegistry {
    stores: Stores,
    clock: Arc<dyn Clock>,
    params: RedemptionParams,
    terminals: Mutex<HashMap<String, TerminalHandle>>,
}

impl TerminalRegistry {
    pub fn new(stores: Stores, clock: Arc<dyn Clock>, params: RedemptionParams) -> Self {
        Self {
            stores,
            clock,
            params,
            terminals: Mutex::new(HashMap::new()),
        }
    }

    pub fn params(&self) -> &RedemptionParams {
        &self.params
    }

    fn map(&self) -> MutexGuard<'_, HashMap<String, TerminalHandle>> {
        self.terminals.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register `terminal_id` for `business`. Registering again for the same
    /// business returns the existing terminal; a terminal never changes
    /// business.
    pub fn register(
        &self,
        terminal_id: &str,
        business: BusinessId,
    ) -> Result<TerminalHandle, RegistryError> {
        if terminal_id.trim().is_empty() {
            return Err(RegistryError::InvalidTerminalId);
        }
        let mut map = self.map();
        if let Some(existing) = map.get(terminal_id) {
            let bound = lock_terminal(existing).business_id();
            if bound != business {
                return Err(RegistryError::BoundToOtherBusiness {
                    terminal: terminal_id.to_string(),
                    business: bound,
                });
            }
            return Ok(Arc::clone(existing));
        }

        let orchestrator = RedemptionOrchestrator::new(
            terminal_id,
            business,
            &self.stores,
            Arc::clone(&self.clock),
            &self.params,
        );
        let handle = Arc::new(Mutex::new(orchestrator));
        map.insert(terminal_id.to_string(), Arc::clone(&handle));
        tracing::info!(terminal = terminal_id, business = %business, "terminal registered");
        Ok(handle)
    }

    pub fn get(&self, terminal_id: &str) -> Option<TerminalHandle> {
        self.map().get(terminal_id).cloned()
    }

    pub fn remove(&self, terminal_id: &str) -> bool {
        self.map().remove(terminal_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map().is_empty()
    }

    fn handles(&self) -> Vec<TerminalHandle> {
        self.map().values().cloned().collect()
    }

    /// Apply the confirmation timeout to every terminal and collect the
    /// events that produced. Terminals are locked one at a time.
    pub fn expire_pending(&self, now: Timestamp) -> Vec<RedemptionEvent> {
        let mut events = Vec::new();
        for handle in self.handles() {
            let mut terminal = lock_terminal(&handle);
            if terminal.expire_pending(now) {
                events.extend(terminal.drain_events());
            }
        }
        events
    }

    /// Number of terminals holding a verified scan.
    pub fn awaiting_count(&self) -> usize {
        self.handles()
            .iter()
            .filter(|h| lock_terminal(h).peek_state().pending().is_some())
            .count()
    }
}
