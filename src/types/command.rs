//! Command types for the transfer process engine
//!
//! A command is an immutable intent to apply exactly one state transition to
//! exactly one transfer process. Commands carry only the data their transition
//! needs; all transition logic lives in the handlers.

use super::outcome::{Failure, FailureKind};
use super::process::ProcessId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Discriminator for command kinds
///
/// Handlers are registered against exactly one kind; lookup is by exact kind
/// with no fallback between siblings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandKind {
    /// Send or acknowledge the transfer request
    Request,

    /// Begin the data transfer
    Start,

    /// Pause a running transfer
    Suspend,

    /// Continue a suspended transfer
    Resume,

    /// Mark the transfer as finished
    Complete,

    /// Abort the transfer
    Terminate,

    /// Record an unrecoverable fault
    Fail,
}

impl CommandKind {
    pub const ALL: [CommandKind; 7] = [
        CommandKind::Request,
        CommandKind::Start,
        CommandKind::Suspend,
        CommandKind::Resume,
        CommandKind::Complete,
        CommandKind::Terminate,
        CommandKind::Fail,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CommandKind::Request => "request",
            CommandKind::Start => "start",
            CommandKind::Suspend => "suspend",
            CommandKind::Resume => "resume",
            CommandKind::Complete => "complete",
            CommandKind::Terminate => "terminate",
            CommandKind::Fail => "fail",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind-specific payload of a command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CommandAction {
    Request,
    Start,
    Suspend {
        /// Optional reason given by the suspending party
        reason: Option<String>,
    },
    Resume,
    Complete,
    Terminate {
        /// Why the transfer was aborted; recorded as the process error detail
        reason: String,
    },
    Fail {
        /// Description of the fault; recorded as the process error detail
        error_detail: String,
    },
}

impl CommandAction {
    pub fn kind(&self) -> CommandKind {
        match self {
            CommandAction::Request => CommandKind::Request,
            CommandAction::Start => CommandKind::Start,
            CommandAction::Suspend { .. } => CommandKind::Suspend,
            CommandAction::Resume => CommandKind::Resume,
            CommandAction::Complete => CommandKind::Complete,
            CommandAction::Terminate { .. } => CommandKind::Terminate,
            CommandAction::Fail { .. } => CommandKind::Fail,
        }
    }
}

/// An intent to transition one transfer process
///
/// The target id is a shared field; the action carries the kind and payload.
/// Redelivering the same command is safe: idempotence is handled by the state
/// machine, not by deduplication here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferCommand {
    /// The process this command targets
    pub process_id: ProcessId,

    /// What to do with it
    pub action: CommandAction,
}

impl TransferCommand {
    pub fn new(process_id: impl Into<ProcessId>, action: CommandAction) -> Self {
        Self {
            process_id: process_id.into(),
            action,
        }
    }

    pub fn request(process_id: impl Into<ProcessId>) -> Self {
        Self::new(process_id, CommandAction::Request)
    }

    pub fn start(process_id: impl Into<ProcessId>) -> Self {
        Self::new(process_id, CommandAction::Start)
    }

    pub fn suspend(process_id: impl Into<ProcessId>, reason: Option<String>) -> Self {
        Self::new(process_id, CommandAction::Suspend { reason })
    }

    pub fn resume(process_id: impl Into<ProcessId>) -> Self {
        Self::new(process_id, CommandAction::Resume)
    }

    pub fn complete(process_id: impl Into<ProcessId>) -> Self {
        Self::new(process_id, CommandAction::Complete)
    }

    pub fn terminate(process_id: impl Into<ProcessId>, reason: impl Into<String>) -> Self {
        Self::new(
            process_id,
            CommandAction::Terminate {
                reason: reason.into(),
            },
        )
    }

    pub fn fail(process_id: impl Into<ProcessId>, error_detail: impl Into<String>) -> Self {
        Self::new(
            process_id,
            CommandAction::Fail {
                error_detail: error_detail.into(),
            },
        )
    }

    pub fn target_process_id(&self) -> &ProcessId {
        &self.process_id
    }

    pub fn kind(&self) -> CommandKind {
        self.action.kind()
    }

    /// Check the command payload, reporting every problem found
    ///
    /// # Returns
    ///
    /// * `Ok(())` - the command is well formed
    /// * `Err(Failure)` - a `Validation` failure carrying one message per problem
    pub fn validate(&self) -> Result<(), Failure> {
        let mut problems = Vec::new();

        if self.process_id.is_blank() {
            problems.push(format!("{} command has a blank process id", self.kind()));
        }

        match &self.action {
            CommandAction::Terminate { reason } if reason.trim().is_empty() => {
                problems.push(format!(
                    "terminate command for process '{}' requires a reason",
                    self.process_id
                ));
            }
            CommandAction::Fail { error_detail } if error_detail.trim().is_empty() => {
                problems.push(format!(
                    "fail command for process '{}' requires an error detail",
                    self.process_id
                ));
            }
            _ => {}
        }

        match Failure::from_messages(FailureKind::Validation, problems) {
            Some(failure) => Err(failure),
            None => Ok(()),
        }
    }
}

impl fmt::Display for TransferCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind(), self.process_id)
    }
}
