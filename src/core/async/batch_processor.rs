//! Batch processing with process-based partitioning
//!
//! This module provides the `BatchProcessor` struct, which applies a batch of
//! replay records concurrently while keeping every process's records in order.
//!
//! # Design
//!
//! A batch is split into one sub-batch per process id. Each sub-batch runs on
//! its own tokio task and applies its records sequentially. Records for
//! different processes therefore proceed in parallel; records for the same
//! process keep their log order. The dispatcher's per-id lock would serialize
//! same-id commands anyway, but only partitioning preserves their order.
//!
//! # Architecture
//!
//! ```text
//! BatchProcessor
//!     └── ReplayEngine           (shared, Arc-backed)
//!         └── CommandDispatcher  (per-id locks, shared store)
//! ```
//!
//! # Thread Safety
//!
//! The processor is cloneable and can be shared across async tasks. All state
//! lives behind the engine's `Arc`s.

use std::collections::HashMap;
use std::panic;

use crate::core::command_queue::DrainReport;
use crate::core::engine::ReplayEngine;
use crate::types::{DispatchFault, ProcessId, ReplayRecord};
use tracing::error;

/// Batch processor with process-based partitioning
#[derive(Debug, Clone)]
pub struct BatchProcessor {
    engine: ReplayEngine,
}

impl BatchProcessor {
    pub fn new(engine: ReplayEngine) -> Self {
        Self { engine }
    }

    /// Partition a batch of records by process id
    ///
    /// # Guarantees
    ///
    /// - Each record appears in exactly one sub-batch
    /// - Records for each process keep their original order
    /// - Sub-batches contain only records for a single process
    pub fn partition_by_process(
        &self,
        batch: Vec<ReplayRecord>,
    ) -> HashMap<ProcessId, Vec<ReplayRecord>> {
        let mut process_batches: HashMap<ProcessId, Vec<ReplayRecord>> = HashMap::new();

        for record in batch {
            process_batches
                .entry(record.process_id().clone())
                .or_default()
                .push(record);
        }

        process_batches
    }

    /// Apply one process's records in order
    ///
    /// Stops at the first dispatch fault; domain failures are tallied and the
    /// remaining records still run.
    pub async fn process_partition(
        &self,
        records: Vec<ReplayRecord>,
    ) -> Result<DrainReport, DispatchFault> {
        let mut report = DrainReport::default();
        for record in records {
            report.absorb(self.engine.apply(record)?);
        }
        Ok(report)
    }

    /// Apply a batch, one task per process
    ///
    /// Waits for every task before returning, so the next batch observes all
    /// of this batch's effects.
    ///
    /// # Panics
    ///
    /// If a partition task panicked, the panic is resumed on the caller once
    /// every other task has finished. The replay then fails the same way the
    /// sequential strategy does.
    pub async fn process_batch(
        &self,
        batch: Vec<ReplayRecord>,
    ) -> Result<DrainReport, DispatchFault> {
        let process_batches = self.partition_by_process(batch);

        let mut tasks = Vec::with_capacity(process_batches.len());
        for (_process_id, records) in process_batches {
            let processor = self.clone();
            tasks.push(tokio::spawn(async move {
                processor.process_partition(records).await
            }));
        }

        let mut report = DrainReport::default();
        let mut fault = None;
        let mut panicked = None;
        for task in tasks {
            match task.await {
                Ok(Ok(partition_report)) => report.absorb(partition_report),
                Ok(Err(e)) => {
                    fault.get_or_insert(e);
                }
                Err(e) => {
                    error!(error = %e, "Partition task panicked");
                    if e.is_panic() {
                        panicked.get_or_insert(e.into_panic());
                    }
                }
            }
        }

        if let Some(payload) = panicked {
            panic::resume_unwind(payload);
        }

        match fault {
            Some(e) => Err(e),
            None => Ok(report),
        }
    }
}
