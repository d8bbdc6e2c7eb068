//! Error types for the transfer process engine
//!
//! Domain failures (illegal transition, unknown process, malformed command) are
//! not errors in this sense: they travel as `CommandOutcome::Failure`. The
//! enums here cover the other classes.
//!
//! # Error Categories
//!
//! - **Store Errors**: persistence faults; retryable
//! - **Registry Errors**: duplicate or missing handler bindings at startup; fatal
//! - **Dispatch Faults**: configuration bugs surfaced while dispatching; fatal
//! - **Replay Errors**: file and runtime faults of the replay driver

use super::command::CommandKind;
use super::process::ProcessId;
use thiserror::Error;

/// Errors reported by a transfer process store
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// No process with the given id
    #[error("Transfer process {id} not found")]
    NotFound {
        /// The id that was looked up
        id: ProcessId,
    },

    /// A process with the given id already exists
    #[error("Transfer process {id} already exists")]
    AlreadyExists {
        /// The id that is already taken
        id: ProcessId,
    },

    /// The backend could not complete the operation
    ///
    /// Transient: the same operation may succeed if attempted again.
    #[error("Store unavailable during {operation}: {message}")]
    Unavailable {
        /// Operation that failed (load, save, create)
        operation: String,
        /// Backend-specific description
        message: String,
    },
}

impl StoreError {
    pub fn not_found(id: &ProcessId) -> Self {
        StoreError::NotFound { id: id.clone() }
    }

    pub fn already_exists(id: &ProcessId) -> Self {
        StoreError::AlreadyExists { id: id.clone() }
    }

    pub fn unavailable(operation: &str, message: impl Into<String>) -> Self {
        StoreError::Unavailable {
            operation: operation.to_string(),
            message: message.into(),
        }
    }
}

/// Errors raised while composing the handler registry
///
/// These abort startup; they are never converted into command outcomes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A second handler was registered for an already bound kind
    #[error("A handler for '{kind}' commands is already registered")]
    DuplicateHandler {
        /// The kind that was bound twice
        kind: CommandKind,
    },

    /// The registry was sealed with command kinds left unbound
    #[error("No handler registered for command kinds: {}", format_kinds(missing))]
    Incomplete {
        /// Every unbound kind, in declaration order
        missing: Vec<CommandKind>,
    },
}

fn format_kinds(kinds: &[CommandKind]) -> String {
    kinds
        .iter()
        .map(CommandKind::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Configuration faults detected while dispatching a command
///
/// A fault means the deployment is broken. Callers must not retry and must not
/// report it to the counterparty as a domain rejection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchFault {
    /// No handler is bound to the command's kind
    #[error("No handler registered for '{kind}' commands")]
    UnresolvedHandler {
        /// The unbound kind
        kind: CommandKind,
    },

    /// A handler produced a process with a different id than it was given
    #[error("Handler for '{kind}' returned process {returned} while handling {expected}")]
    HandlerIdMismatch {
        kind: CommandKind,
        expected: ProcessId,
        returned: ProcessId,
    },
}

/// Errors of the command-log replay driver
#[derive(Debug, Error)]
pub enum ReplayError {
    /// Input file could not be opened
    #[error("Failed to open file '{path}': {message}")]
    Open { path: String, message: String },

    /// CSV output could not be written
    #[error("Failed to write output: {0}")]
    Output(String),

    /// Async runtime could not be created
    #[error("Failed to create tokio runtime: {0}")]
    Runtime(String),

    /// The engine hit a configuration fault
    #[error(transparent)]
    Fault(#[from] DispatchFault),

    /// The engine could not be composed
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The final snapshot could not be read from the store
    #[error("Failed to read process snapshot: {0}")]
    Store(#[from] StoreError),
}

impl From<csv::Error> for ReplayError {
    fn from(error: csv::Error) -> Self {
        ReplayError::Output(error.to_string())
    }
}
