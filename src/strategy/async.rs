//! Asynchronous batch replay strategy
//!
//! Reads the command log in batches and applies each batch with
//! process-based partitioning on a tokio multi-threaded runtime.
//!
//! # Architecture
//!
//! ```text
//! AsyncReplayStrategy
//!     ├── BatchConfig     (batch_size, max_concurrent_batches)
//!     ├── AsyncReader     (batch CSV reading)
//!     └── BatchProcessor  (process partitioning + tokio tasks)
//!         └── ReplayEngine
//! ```
//!
//! # Ordering
//!
//! Batches run one after another; the next batch is read only after every
//! task of the current one has finished. Within a batch, each process's
//! records run in order on a single task. A process whose records span
//! several batches therefore still sees them in log order, which is what
//! makes the output identical to the sync strategy's.

use crate::core::command_queue::{DrainReport, RetryPolicy};
use crate::core::engine::ReplayEngine;
use crate::core::r#async::BatchProcessor;
use crate::io::async_reader::AsyncReader;
use crate::io::csv_format::write_processes_csv;
use crate::strategy::ReplayStrategy;
use crate::types::ReplayError;
use std::io::Write;
use std::path::Path;
use tracing::{info, warn};

/// Configuration for batch processing
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchConfig {
    /// Number of records per batch
    pub batch_size: usize,
    /// Worker threads of the tokio runtime
    pub max_concurrent_batches: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            max_concurrent_batches: num_cpus::get(),
        }
    }
}

impl BatchConfig {
    /// Create a config; zero values fall back to the defaults with a warning
    pub fn new(batch_size: usize, max_concurrent_batches: usize) -> Self {
        let default = Self::default();

        let batch_size = if batch_size == 0 {
            warn!(
                batch_size,
                default = default.batch_size,
                "Invalid batch_size, using default"
            );
            default.batch_size
        } else {
            batch_size
        };

        let max_concurrent_batches = if max_concurrent_batches == 0 {
            warn!(
                max_concurrent_batches,
                default = default.max_concurrent_batches,
                "Invalid max_concurrent_batches, using default"
            );
            default.max_concurrent_batches
        } else {
            max_concurrent_batches
        };

        Self {
            batch_size,
            max_concurrent_batches,
        }
    }
}

/// Asynchronous batch replay strategy
#[derive(Debug, Clone)]
pub struct AsyncReplayStrategy {
    config: BatchConfig,
    retry: RetryPolicy,
}

impl AsyncReplayStrategy {
    pub fn new(config: BatchConfig, retry: RetryPolicy) -> Self {
        Self { config, retry }
    }
}

impl ReplayStrategy for AsyncReplayStrategy {
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), ReplayError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.config.max_concurrent_batches)
            .build()
            .map_err(|e| ReplayError::Runtime(e.to_string()))?;

        runtime.block_on(async {
            let engine = ReplayEngine::in_memory(self.retry)?;
            let processor = BatchProcessor::new(engine.clone());

            let file = tokio::fs::File::open(input_path)
                .await
                .map_err(|e| ReplayError::Open {
                    path: input_path.display().to_string(),
                    message: e.to_string(),
                })?;

            // csv-async reads through the futures io traits
            let compat_file = tokio_util::compat::TokioAsyncReadCompatExt::compat(file);
            let mut reader = AsyncReader::new(compat_file);

            let mut report = DrainReport::default();
            let mut batches = 0usize;
            loop {
                let batch = reader.read_batch(self.config.batch_size).await;
                if batch.is_empty() {
                    break;
                }
                batches += 1;
                report.absorb(processor.process_batch(batch).await?);
            }

            info!(
                batches,
                processed = report.processed,
                rejected = report.rejected,
                retried = report.retried,
                exhausted = report.exhausted,
                "Replay finished"
            );

            write_processes_csv(&engine.processes()?, output)
        })
    }
}
