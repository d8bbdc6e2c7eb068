//! Command handlers, one per command kind
//!
//! Every handler delegates the state decision to the state machine and then
//! applies its kind-specific payload to the process. A replay that the state
//! machine reports as a no-op returns the process untouched, so the timestamp,
//! counter and error detail stay exactly as persisted.

use super::state_machine;
use super::traits::CommandHandler;
use crate::types::{CommandAction, CommandKind, CommandOutcome, TransferCommand, TransferProcess};
use chrono::{DateTime, Utc};

/// Run the state machine for `kind` and, on a real transition, stamp the new
/// state and let `apply` write the payload.
fn transition_process<F>(
    mut process: TransferProcess,
    kind: CommandKind,
    at: DateTime<Utc>,
    apply: F,
) -> CommandOutcome<TransferProcess>
where
    F: FnOnce(&mut TransferProcess),
{
    let step = match state_machine::transition(process.state, kind) {
        CommandOutcome::Success(step) => step,
        CommandOutcome::Failure(failure) => return CommandOutcome::Failure(failure),
    };

    if step.is_noop() {
        return CommandOutcome::success(process);
    }

    process.transition_to(step.to, at);
    apply(&mut process);
    CommandOutcome::success(process)
}

/// INITIAL → REQUESTED
#[derive(Debug, Default, Clone, Copy)]
pub struct RequestTransferHandler;

impl CommandHandler for RequestTransferHandler {
    fn kind(&self) -> CommandKind {
        CommandKind::Request
    }

    fn handle(
        &self,
        process: TransferProcess,
        command: &TransferCommand,
        at: DateTime<Utc>,
    ) -> CommandOutcome<TransferProcess> {
        debug_assert_eq!(command.kind(), self.kind());
        transition_process(process, self.kind(), at, |_| {})
    }
}

/// REQUESTED → STARTED
#[derive(Debug, Default, Clone, Copy)]
pub struct StartTransferHandler;

impl CommandHandler for StartTransferHandler {
    fn kind(&self) -> CommandKind {
        CommandKind::Start
    }

    fn handle(
        &self,
        process: TransferProcess,
        command: &TransferCommand,
        at: DateTime<Utc>,
    ) -> CommandOutcome<TransferProcess> {
        debug_assert_eq!(command.kind(), self.kind());
        transition_process(process, self.kind(), at, |_| {})
    }
}

/// STARTED → SUSPENDED, recording the reason if one was given
#[derive(Debug, Default, Clone, Copy)]
pub struct SuspendTransferHandler;

impl CommandHandler for SuspendTransferHandler {
    fn kind(&self) -> CommandKind {
        CommandKind::Suspend
    }

    fn handle(
        &self,
        process: TransferProcess,
        command: &TransferCommand,
        at: DateTime<Utc>,
    ) -> CommandOutcome<TransferProcess> {
        debug_assert_eq!(command.kind(), self.kind());
        let reason = match &command.action {
            CommandAction::Suspend { reason } => reason.clone(),
            _ => None,
        };
        transition_process(process, self.kind(), at, |p| p.error_detail = reason)
    }
}

/// SUSPENDED → STARTED, clearing the suspension reason
#[derive(Debug, Default, Clone, Copy)]
pub struct ResumeTransferHandler;

impl CommandHandler for ResumeTransferHandler {
    fn kind(&self) -> CommandKind {
        CommandKind::Resume
    }

    fn handle(
        &self,
        process: TransferProcess,
        command: &TransferCommand,
        at: DateTime<Utc>,
    ) -> CommandOutcome<TransferProcess> {
        debug_assert_eq!(command.kind(), self.kind());
        transition_process(process, self.kind(), at, |p| p.error_detail = None)
    }
}

/// STARTED → COMPLETED
#[derive(Debug, Default, Clone, Copy)]
pub struct CompleteTransferHandler;

impl CommandHandler for CompleteTransferHandler {
    fn kind(&self) -> CommandKind {
        CommandKind::Complete
    }

    fn handle(
        &self,
        process: TransferProcess,
        command: &TransferCommand,
        at: DateTime<Utc>,
    ) -> CommandOutcome<TransferProcess> {
        debug_assert_eq!(command.kind(), self.kind());
        transition_process(process, self.kind(), at, |p| p.error_detail = None)
    }
}

/// Any non-terminal state → TERMINATED
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminateTransferHandler;

impl CommandHandler for TerminateTransferHandler {
    fn kind(&self) -> CommandKind {
        CommandKind::Terminate
    }

    fn handle(
        &self,
        process: TransferProcess,
        command: &TransferCommand,
        at: DateTime<Utc>,
    ) -> CommandOutcome<TransferProcess> {
        debug_assert_eq!(command.kind(), self.kind());
        let reason = match &command.action {
            CommandAction::Terminate { reason } => Some(reason.clone()),
            _ => None,
        };
        transition_process(process, self.kind(), at, |p| p.error_detail = reason)
    }
}

/// Any non-terminal state → ERROR
#[derive(Debug, Default, Clone, Copy)]
pub struct FailTransferHandler;

impl CommandHandler for FailTransferHandler {
    fn kind(&self) -> CommandKind {
        CommandKind::Fail
    }

    fn handle(
        &self,
        process: TransferProcess,
        command: &TransferCommand,
        at: DateTime<Utc>,
    ) -> CommandOutcome<TransferProcess> {
        debug_assert_eq!(command.kind(), self.kind());
        let detail = match &command.action {
            CommandAction::Fail { error_detail } => Some(error_detail.clone()),
            _ => None,
        };
        transition_process(process, self.kind(), at, |p| p.error_detail = detail)
    }
}
