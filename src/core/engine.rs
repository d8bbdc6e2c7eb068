//! Command-log replay engine
//!
//! This module provides the `ReplayEngine`, which applies parsed command-log
//! entries to a store. It plays the part of the protocol adapter: `initiate`
//! entries create new processes, every other entry is handed to a
//! `CommandProcessor` so retryable storage failures get the configured number
//! of attempts.
//!
//! The engine is shared (`Arc`) between the sync strategy and the tasks of the
//! batch processor. Each call gets its own processor queue, so a retry never
//! leaves the partition that submitted the command.

use super::command_queue::{CommandProcessor, DrainReport, RetryPolicy};
use super::dispatcher::CommandDispatcher;
use super::observable::{TracingListener, TransferProcessObservable};
use super::registry::CommandHandlerRegistry;
use super::store::InMemoryTransferProcessStore;
use super::traits::{Clock, TransferProcessStore};
use crate::types::{DispatchFault, RegistryError, ReplayRecord, StoreError, TransferProcess};
use std::sync::Arc;
use tracing::{debug, warn};

/// Applies replay records through a shared dispatcher
#[derive(Debug, Clone)]
pub struct ReplayEngine {
    dispatcher: Arc<CommandDispatcher>,
    retry: RetryPolicy,
}

impl ReplayEngine {
    pub fn new(dispatcher: Arc<CommandDispatcher>, retry: RetryPolicy) -> Self {
        Self { dispatcher, retry }
    }

    /// Compose an engine over an empty in-memory store with the built-in
    /// handlers and a `TracingListener`
    pub fn in_memory(retry: RetryPolicy) -> Result<Self, RegistryError> {
        let registry = Arc::new(CommandHandlerRegistry::with_default_handlers()?);
        let store = Arc::new(InMemoryTransferProcessStore::new());
        let observable = TransferProcessObservable::new().with_listener(Arc::new(TracingListener));
        let dispatcher =
            Arc::new(CommandDispatcher::new(registry, store).with_observable(observable));
        Ok(Self::new(dispatcher, retry))
    }

    pub fn dispatcher(&self) -> &Arc<CommandDispatcher> {
        &self.dispatcher
    }

    /// Apply one record
    ///
    /// # Returns
    ///
    /// * `Ok(DrainReport)` - tally for this record; a failed `initiate` counts
    ///   as rejected
    /// * `Err(DispatchFault)` - configuration fault; replay should stop
    pub fn apply(&self, record: ReplayRecord) -> Result<DrainReport, DispatchFault> {
        match record {
            ReplayRecord::Initiate(id) => {
                let process = TransferProcess::new(id, self.dispatcher.clock().now());
                let mut report = DrainReport::default();
                match self.dispatcher.store().create(process) {
                    Ok(()) => {
                        report.processed = 1;
                    }
                    Err(e) => {
                        warn!(error = %e, "Initiate rejected");
                        report.rejected = 1;
                    }
                }
                Ok(report)
            }
            ReplayRecord::Command(command) => {
                let processor = CommandProcessor::new(Arc::clone(&self.dispatcher), self.retry);
                processor.enqueue(command);
                processor.drain()
            }
        }
    }

    /// Snapshot of every process, sorted by id
    pub fn processes(&self) -> Result<Vec<TransferProcess>, StoreError> {
        let mut processes = self.dispatcher.store().all()?;
        processes.sort_by(|a, b| a.id.cmp(&b.id));
        debug!(count = processes.len(), "Collected process snapshot");
        Ok(processes)
    }
}
