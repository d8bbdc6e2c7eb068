//! Fan-out of committed state changes to registered listeners

use super::traits::TransferProcessListener;
use crate::types::{TransferProcess, TransferProcessState};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Immutable set of listeners, composed at startup
#[derive(Clone, Default)]
pub struct TransferProcessObservable {
    listeners: Vec<Arc<dyn TransferProcessListener>>,
}

impl TransferProcessObservable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_listener(mut self, listener: Arc<dyn TransferProcessListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Notify every listener of a committed change from `previous`
    pub fn notify(&self, process: &TransferProcess, previous: TransferProcessState) {
        for listener in &self.listeners {
            listener.state_changed(process, previous);
            match process.state {
                TransferProcessState::Requested => listener.requested(process),
                TransferProcessState::Started => listener.started(process),
                TransferProcessState::Suspended => listener.suspended(process),
                TransferProcessState::Completed => listener.completed(process),
                TransferProcessState::Terminated => listener.terminated(process),
                TransferProcessState::Error => listener.failed(process),
                TransferProcessState::Initial => {}
            }
        }
    }
}

impl fmt::Debug for TransferProcessObservable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferProcessObservable")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// Listener that reports committed changes through `tracing`
///
/// Terminal states are logged at info, everything else at debug.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingListener;

impl TransferProcessListener for TracingListener {
    fn state_changed(&self, process: &TransferProcess, previous: TransferProcessState) {
        if process.state.is_terminal() {
            info!(
                process_id = %process.id,
                from = %previous,
                to = %process.state,
                error_detail = process.error_detail.as_deref().unwrap_or(""),
                "Transfer process finished"
            );
        } else {
            debug!(process_id = %process.id, from = %previous, to = %process.state, "State changed");
        }
    }
}
