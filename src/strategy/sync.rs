//! Synchronous replay strategy
//!
//! Single pass over the command log on the calling thread:
//! - `SyncReader` streams rows
//! - `ReplayEngine` applies each record
//! - `csv_format::write_processes_csv` writes the snapshot
//!
//! Memory use is O(processes), not O(rows).

use crate::core::command_queue::{DrainReport, RetryPolicy};
use crate::core::engine::ReplayEngine;
use crate::io::csv_format::write_processes_csv;
use crate::io::sync_reader::SyncReader;
use crate::strategy::ReplayStrategy;
use crate::types::ReplayError;
use std::io::Write;
use std::path::Path;
use tracing::{info, warn};

/// Synchronous replay strategy
///
/// ```no_run
/// use transfer_process_engine::core::RetryPolicy;
/// use transfer_process_engine::strategy::{ReplayStrategy, SyncReplayStrategy};
/// use std::path::Path;
///
/// let strategy = SyncReplayStrategy::new(RetryPolicy::default());
/// strategy
///     .process(Path::new("commands.csv"), &mut std::io::stdout())
///     .expect("Replay failed");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncReplayStrategy {
    retry: RetryPolicy,
}

impl SyncReplayStrategy {
    pub fn new(retry: RetryPolicy) -> Self {
        Self { retry }
    }
}

impl ReplayStrategy for SyncReplayStrategy {
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), ReplayError> {
        let engine = ReplayEngine::in_memory(self.retry)?;
        let reader = SyncReader::new(input_path)?;

        let mut report = DrainReport::default();
        let mut skipped = 0usize;
        for result in reader {
            match result {
                Ok(record) => report.absorb(engine.apply(record)?),
                Err(e) => {
                    skipped += 1;
                    warn!(error = %e, "Skipping command-log row");
                }
            }
        }

        info!(
            processed = report.processed,
            rejected = report.rejected,
            retried = report.retried,
            exhausted = report.exhausted,
            skipped,
            "Replay finished"
        );

        write_processes_csv(&engine.processes()?, output)
    }
}
