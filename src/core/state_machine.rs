//! Transfer process state machine
//!
//! A pure function from `(current state, command kind)` to the next state or a
//! rejection. It never touches the store.
//!
//! # Transition Table
//!
//! ```text
//! INITIAL ──request──▶ REQUESTED ──start──▶ STARTED ──complete──▶ COMPLETED
//!                                             │  ▲
//!                                     suspend │  │ resume
//!                                             ▼  │
//!                                           SUSPENDED
//!
//! any non-terminal ──terminate──▶ TERMINATED
//! any non-terminal ──fail───────▶ ERROR
//! ```
//!
//! # Rules
//!
//! 1. If the kind's target state equals the current state, the command is an
//!    idempotent replay: success, same state.
//! 2. COMPLETED, TERMINATED and ERROR accept nothing else.
//! 3. Otherwise the current state must be a permitted source for the kind.

use crate::types::{CommandKind, CommandOutcome, TransferProcessState};

use TransferProcessState::*;

const NON_TERMINAL: &[TransferProcessState] = &[Initial, Requested, Started, Suspended];

/// A transition accepted by the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: TransferProcessState,
    pub to: TransferProcessState,
}

impl Transition {
    /// True for an idempotent replay that leaves the state unchanged
    pub fn is_noop(&self) -> bool {
        self.from == self.to
    }
}

/// The state a command kind drives a process into
pub fn target_state(kind: CommandKind) -> TransferProcessState {
    match kind {
        CommandKind::Request => Requested,
        CommandKind::Start => Started,
        CommandKind::Suspend => Suspended,
        CommandKind::Resume => Started,
        CommandKind::Complete => Completed,
        CommandKind::Terminate => Terminated,
        CommandKind::Fail => Error,
    }
}

/// States from which `kind` may be applied (excluding the idempotent case)
pub fn permitted_sources(kind: CommandKind) -> &'static [TransferProcessState] {
    match kind {
        CommandKind::Request => &[Initial],
        CommandKind::Start => &[Requested],
        CommandKind::Suspend => &[Started],
        CommandKind::Resume => &[Suspended],
        CommandKind::Complete => &[Started],
        CommandKind::Terminate | CommandKind::Fail => NON_TERMINAL,
    }
}

/// Evaluate `kind` against `current`
///
/// # Returns
///
/// * `Success(Transition)` - permitted, possibly as a no-op replay
/// * `Failure` - `IllegalTransition`, naming both the state and the kind
pub fn transition(current: TransferProcessState, kind: CommandKind) -> CommandOutcome<Transition> {
    let to = target_state(kind);

    if current == to {
        return CommandOutcome::success(Transition { from: current, to });
    }

    if current.is_terminal() {
        return CommandOutcome::illegal_transition(format!(
            "Cannot apply '{}' to transfer process in terminal state {}",
            kind, current
        ));
    }

    if permitted_sources(kind).contains(&current) {
        CommandOutcome::success(Transition { from: current, to })
    } else {
        CommandOutcome::illegal_transition(format!(
            "Cannot apply '{}' to transfer process in state {}",
            kind, current
        ))
    }
}
