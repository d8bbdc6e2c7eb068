//! Transfer Process Engine Library
//!
//! # Overview
//!
//! Command handling for the transfer processes of a dataspace connector. A
//! command (request, start, suspend, resume, complete, terminate, fail) names
//! the process it targets; the engine loads that process, checks the move
//! against the lifecycle state machine, persists the new state and notifies
//! listeners. Every command yields an explicit `CommandOutcome`.
//!
//! # Architecture
//!
//! - [`types`] - Processes, states, commands, outcomes and error enums
//! - [`core`] - Command processing:
//!   - [`core::state_machine`] - Transition table
//!   - [`core::handlers`] / [`core::registry`] - One handler per command kind
//!   - [`core::dispatcher`] - Per-process serialized load → transition → save
//!   - [`core::command_queue`] - Bounded retry of transient storage failures
//!   - [`core::engine`] / [`core::r#async`] - Command-log replay, sequential or
//!     partitioned by process
//! - [`io`] - Command-log CSV parsing and snapshot output
//! - [`strategy`] - Sync and async replay pipelines
//! - [`cli`] - CLI argument parsing
//! - [`logging`] - tracing subscriber setup
//!
//! # Lifecycle
//!
//! ```text
//! INITIAL ─request─▶ REQUESTED ─start─▶ STARTED ─complete─▶ COMPLETED
//!                                        │    ▲
//!                                 suspend│    │resume
//!                                        ▼    │
//!                                       SUSPENDED
//!
//! any non-terminal ─terminate─▶ TERMINATED
//! any non-terminal ─fail──────▶ ERROR
//! ```
//!
//! COMPLETED, TERMINATED and ERROR are terminal. Re-issuing the command that
//! produced the current state is an idempotent success.

pub mod cli;
pub mod core;
pub mod io;
pub mod logging;
pub mod strategy;
pub mod types;

pub use core::{
    CommandDispatcher, CommandHandlerRegistry, CommandProcessor, InMemoryTransferProcessStore,
    ReplayEngine, RetryPolicy, TransferProcessObservable,
};
pub use io::write_processes_csv;
pub use types::{
    CommandKind, CommandOutcome, DispatchFault, Failure, FailureKind, ProcessId, ReplayRecord,
    TransferCommand, TransferProcess, TransferProcessState,
};
