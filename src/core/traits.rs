//! Core traits at the seams of the command engine
//!
//! These abstractions let the dispatcher run against any persistence backend,
//! any set of handlers and any notification sink. All of them are used from
//! many worker threads at once, hence the `Send + Sync` bounds.

use crate::types::{
    CommandKind, CommandOutcome, ProcessId, StoreError, TransferCommand, TransferProcess,
    TransferProcessState,
};
use chrono::{DateTime, Utc};

/// Persistence contract for transfer processes
///
/// Implementations must give read-after-write visibility for the same id:
/// a `load` issued after a successful `save` returns the saved value.
pub trait TransferProcessStore: Send + Sync {
    /// Fetch the current value for `id`, if any
    fn load(&self, id: &ProcessId) -> Result<Option<TransferProcess>, StoreError>;

    /// Overwrite the stored value for `process.id`
    fn save(&self, process: &TransferProcess) -> Result<(), StoreError>;

    /// Insert a new process; fails with `AlreadyExists` if the id is taken
    fn create(&self, process: TransferProcess) -> Result<(), StoreError>;

    /// Snapshot of every stored process
    fn all(&self) -> Result<Vec<TransferProcess>, StoreError>;
}

/// Transition logic for exactly one command kind
///
/// Handlers are pure: they receive the loaded process by value and return the
/// process to persist. They never touch the store or emit notifications.
pub trait CommandHandler: Send + Sync {
    /// The single kind this handler is bound to
    fn kind(&self) -> CommandKind;

    /// Compute the next process value for `command`
    ///
    /// `at` is the time stamped onto the process if the state changes.
    fn handle(
        &self,
        process: TransferProcess,
        command: &TransferCommand,
        at: DateTime<Utc>,
    ) -> CommandOutcome<TransferProcess>;
}

/// Observer of committed state changes
///
/// `state_changed` is called for every committed transition; the per-state
/// hooks are called in addition, depending on the new state. All methods
/// default to no-ops so listeners only override what they care about.
///
/// Calls for one process arrive in commit order, made while the dispatcher
/// still holds that process's lock. A listener must not dispatch a command
/// for the process it is being notified about.
pub trait TransferProcessListener: Send + Sync {
    fn state_changed(&self, _process: &TransferProcess, _previous: TransferProcessState) {}

    fn requested(&self, _process: &TransferProcess) {}

    fn started(&self, _process: &TransferProcess) {}

    fn suspended(&self, _process: &TransferProcess) {}

    fn completed(&self, _process: &TransferProcess) {}

    fn terminated(&self, _process: &TransferProcess) {}

    fn failed(&self, _process: &TransferProcess) {}
}

/// Source of transition timestamps
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
