//! Core command-processing components
//!
//! - `traits` - Seams for the store, handlers, listeners and the clock
//! - `state_machine` - Transition table and idempotence rules
//! - `handlers` - One handler per command kind
//! - `registry` - Kind → handler mapping, sealed at startup
//! - `store` - In-memory `DashMap` store
//! - `observable` - Listener fan-out for committed changes
//! - `dispatcher` - Per-process serialized command application
//! - `command_queue` - FIFO of pending commands with bounded retry
//! - `engine` - Applies parsed command-log records
//! - `async` - Batch processing partitioned by process id

pub mod r#async;
pub mod command_queue;
pub mod dispatcher;
pub mod engine;
pub mod handlers;
pub mod observable;
pub mod registry;
pub mod state_machine;
pub mod store;
pub mod traits;

pub use command_queue::{
    CommandProcessor, CommandQueue, DrainReport, ProcessingStatus, QueuedCommand, RetryPolicy,
};
pub use dispatcher::CommandDispatcher;
pub use engine::ReplayEngine;
pub use observable::{TracingListener, TransferProcessObservable};
pub use r#async::BatchProcessor;
pub use registry::{CommandHandlerRegistry, RegistryBuilder};
pub use store::InMemoryTransferProcessStore;
pub use traits::{Clock, CommandHandler, SystemClock, TransferProcessListener, TransferProcessStore};
