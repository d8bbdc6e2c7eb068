//! Replay strategy module
//!
//! A strategy is a complete replay pipeline: read the command log, apply every
//! record through a `ReplayEngine`, write the final process snapshot. The
//! synchronous and the batched asynchronous pipelines are selected at runtime
//! and must produce identical output for the same log.

use crate::cli::StrategyType;
use crate::core::command_queue::RetryPolicy;
use crate::types::ReplayError;
use std::io::Write;
use std::path::Path;

pub mod r#async;
pub mod sync;

pub use self::r#async::{AsyncReplayStrategy, BatchConfig};
pub use sync::SyncReplayStrategy;

/// Complete command-log replay pipeline
pub trait ReplayStrategy: Send + Sync {
    /// Replay `input_path` and write the resulting snapshot to `output`
    ///
    /// # Returns
    ///
    /// * `Ok(())` - replay finished; rejected commands and malformed rows are
    ///   logged, not returned
    /// * `Err(ReplayError)` - the input could not be opened, output could not
    ///   be written, the runtime failed, or the engine hit a configuration
    ///   fault
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), ReplayError>;
}

/// Build the strategy for `strategy_type`
///
/// `config` is only consulted by the async strategy; `None` means defaults.
pub fn create_strategy(
    strategy_type: StrategyType,
    config: Option<BatchConfig>,
    retry: RetryPolicy,
) -> Box<dyn ReplayStrategy> {
    match strategy_type {
        StrategyType::Sync => Box::new(SyncReplayStrategy::new(retry)),
        StrategyType::Async => {
            let config = config.unwrap_or_default();
            Box::new(AsyncReplayStrategy::new(config, retry))
        }
    }
}
