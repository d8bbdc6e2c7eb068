//! Types module
//!
//! Contains core data structures used throughout the engine.
//! This module organizes types into logical submodules:
//! - `process`: Transfer process record, identifiers and lifecycle states
//! - `command`: Command intents and their kind discriminator
//! - `outcome`: Explicit success/failure outcome of a command
//! - `record`: Parsed command-log entries
//! - `error`: Error types for stores, registry composition and dispatch faults

pub mod command;
pub mod error;
pub mod outcome;
pub mod process;
pub mod record;

pub use command::{CommandAction, CommandKind, TransferCommand};
pub use error::{DispatchFault, RegistryError, ReplayError, StoreError};
pub use outcome::{CommandOutcome, Failure, FailureKind};
pub use process::{ProcessId, TransferProcess, TransferProcessState};
pub use record::ReplayRecord;
