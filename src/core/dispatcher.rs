//! Command dispatch with per-process serialization
//!
//! This module provides the `CommandDispatcher`, which applies a command to its
//! target transfer process:
//!
//! ```text
//! resolve handler ─▶ validate ─▶ lock(id) ─▶ load ─▶ handle ─▶ save ─▶ notify ─▶ unlock(id)
//! ```
//!
//! # Concurrency
//!
//! Each process id has its own mutex, kept in a `DashMap`. Commands for
//! different ids never share a lock; commands for the same id run their
//! load → transition → save sequence one at a time. Handler resolution and
//! validation happen before the lock is taken. Listeners are notified while it
//! is still held, so a process's changes are announced in commit order.
//!
//! Once a command holds its id's lock it runs to completion. There is no
//! cancellation point inside the critical section.
//!
//! # Outcomes
//!
//! - `Ok(Success(process))` - committed (or an idempotent replay)
//! - `Ok(Failure(..))` - domain rejection or retryable storage failure; nothing
//!   was written
//! - `Err(DispatchFault)` - configuration bug; do not retry

use super::observable::TransferProcessObservable;
use super::registry::CommandHandlerRegistry;
use super::traits::{Clock, CommandHandler, SystemClock, TransferProcessStore};
use crate::types::{
    CommandOutcome, DispatchFault, Failure, FailureKind, ProcessId, TransferCommand,
    TransferProcess, TransferProcessState,
};
use dashmap::DashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, error, warn};

/// What happened inside the critical section
enum Commit {
    /// Nothing written
    Rejected(Failure),
    /// Idempotent replay; nothing written
    Unchanged(TransferProcess),
    /// New value persisted
    Changed {
        process: TransferProcess,
        previous: TransferProcessState,
    },
}

/// Applies commands to transfer processes
///
/// Cheap to share: wrap it in an `Arc` and call `apply` from any number of
/// threads or tasks.
pub struct CommandDispatcher {
    /// Immutable after startup; read without synchronization
    registry: Arc<CommandHandlerRegistry>,

    /// Owner of every transfer process
    store: Arc<dyn TransferProcessStore>,

    /// Notified after each committed state change
    observable: TransferProcessObservable,

    /// Source of transition timestamps
    clock: Arc<dyn Clock>,

    /// One mutex per process id that has ever been dispatched to
    ///
    /// Entries are never removed: a waiter may hold a clone of the `Arc`, and
    /// replacing the entry would let a second writer in.
    guards: DashMap<ProcessId, Arc<Mutex<()>>>,
}

impl CommandDispatcher {
    pub fn new(registry: Arc<CommandHandlerRegistry>, store: Arc<dyn TransferProcessStore>) -> Self {
        Self {
            registry,
            store,
            observable: TransferProcessObservable::new(),
            clock: Arc::new(SystemClock),
            guards: DashMap::new(),
        }
    }

    pub fn with_observable(mut self, observable: TransferProcessObservable) -> Self {
        self.observable = observable;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &Arc<dyn TransferProcessStore> {
        &self.store
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Apply `command` to its target process
    ///
    /// # Returns
    ///
    /// * `Ok(CommandOutcome::Success(process))` - the persisted process. For an
    ///   idempotent replay this is the unchanged stored value and no
    ///   notification is emitted.
    /// * `Ok(CommandOutcome::Failure(..))` - `Validation`, `NotFound` or
    ///   `IllegalTransition` (do not retry), or `Storage` (safe to resubmit
    ///   the same command). The store is unchanged.
    /// * `Err(DispatchFault)` - no handler is bound to the command's kind, or
    ///   a handler broke its contract
    pub fn apply(
        &self,
        command: &TransferCommand,
    ) -> Result<CommandOutcome<TransferProcess>, DispatchFault> {
        let kind = command.kind();
        // Unreachable with a registry from `RegistryBuilder::build`; kept as a guard.
        let handler = self.registry.resolve(kind).ok_or_else(|| {
            error!(process_id = %command.process_id, %kind, "No handler registered");
            DispatchFault::UnresolvedHandler { kind }
        })?;

        if let Err(failure) = command.validate() {
            warn!(process_id = %command.process_id, %kind, %failure, "Command rejected");
            return Ok(CommandOutcome::Failure(failure));
        }

        let commit = {
            let guard = self.guard_for(&command.process_id);
            // The mutex protects no data of its own, so a poisoned lock is
            // still a valid lock.
            let _held = guard.lock().unwrap_or_else(PoisonError::into_inner);
            let commit = self.commit(handler, command)?;
            // Announced under the lock so one process's commits reach
            // listeners in commit order.
            if let Commit::Changed { process, previous } = &commit {
                self.observable.notify(process, *previous);
            }
            commit
        };

        match commit {
            Commit::Rejected(failure) => {
                warn!(process_id = %command.process_id, %kind, %failure, "Command not applied");
                Ok(CommandOutcome::Failure(failure))
            }
            Commit::Unchanged(process) => {
                debug!(process_id = %process.id, %kind, state = %process.state, "Replay ignored");
                Ok(CommandOutcome::success(process))
            }
            Commit::Changed { process, previous } => {
                debug!(
                    process_id = %process.id,
                    %kind,
                    from = %previous,
                    to = %process.state,
                    "Transition committed"
                );
                Ok(CommandOutcome::success(process))
            }
        }
    }

    fn guard_for(&self, id: &ProcessId) -> Arc<Mutex<()>> {
        // Clone out of the map so the shard lock is released before we block
        // on the per-id mutex.
        self.guards
            .entry(id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Load → transition → save; caller holds the id's lock
    fn commit(
        &self,
        handler: &dyn CommandHandler,
        command: &TransferCommand,
    ) -> Result<Commit, DispatchFault> {
        let id = &command.process_id;

        let current = match self.store.load(id) {
            Ok(Some(process)) => process,
            Ok(None) => {
                return Ok(Commit::Rejected(Failure::new(
                    FailureKind::NotFound,
                    format!("Transfer process {} not found", id),
                )))
            }
            Err(e) => {
                return Ok(Commit::Rejected(Failure::new(
                    FailureKind::Storage,
                    e.to_string(),
                )))
            }
        };

        let previous = current.clone();
        let next = match handler.handle(current, command, self.clock.now()) {
            CommandOutcome::Success(next) => next,
            CommandOutcome::Failure(failure) => return Ok(Commit::Rejected(failure)),
        };

        if next.id != previous.id {
            error!(expected = %previous.id, returned = %next.id, "Handler changed process id");
            return Err(DispatchFault::HandlerIdMismatch {
                kind: handler.kind(),
                expected: previous.id,
                returned: next.id,
            });
        }

        if next == previous {
            return Ok(Commit::Unchanged(next));
        }

        if let Err(e) = self.store.save(&next) {
            return Ok(Commit::Rejected(Failure::new(
                FailureKind::Storage,
                e.to_string(),
            )));
        }

        if next.state == previous.state {
            // Payload-only update (same state); persisted but not announced.
            return Ok(Commit::Unchanged(next));
        }

        Ok(Commit::Changed {
            process: next,
            previous: previous.state,
        })
    }
}

impl fmt::Debug for CommandDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDispatcher")
            .field("registry", &self.registry)
            .field("observable", &self.observable)
            .field("guards", &self.guards.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::InMemoryTransferProcessStore;
    use crate::core::traits::TransferProcessListener;
    use crate::types::{CommandKind, StoreError};
    use chrono::{DateTime, TimeZone, Utc};
    use rstest::rstest;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Condvar, Mutex};
    use std::thread;
    use std::time::Duration;

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    fn created() -> DateTime<Utc> {
        Utc.timestamp_opt(1_000, 0).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(5_000, 0).unwrap()
    }

    #[derive(Default)]
    struct CountingListener {
        changes: AtomicUsize,
        completed: AtomicUsize,
    }

    impl TransferProcessListener for CountingListener {
        fn state_changed(&self, _process: &TransferProcess, _previous: TransferProcessState) {
            self.changes.fetch_add(1, Ordering::SeqCst);
        }

        fn completed(&self, _process: &TransferProcess) {
            self.completed.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Store whose first `failures` saves report the backend as unavailable
    struct FlakyStore {
        inner: InMemoryTransferProcessStore,
        failures: AtomicUsize,
        saves: AtomicUsize,
    }

    impl FlakyStore {
        fn new(failures: usize, processes: Vec<TransferProcess>) -> Self {
            Self {
                inner: InMemoryTransferProcessStore::with_processes(processes),
                failures: AtomicUsize::new(failures),
                saves: AtomicUsize::new(0),
            }
        }
    }

    impl TransferProcessStore for FlakyStore {
        fn load(&self, id: &ProcessId) -> Result<Option<TransferProcess>, StoreError> {
            self.inner.load(id)
        }

        fn save(&self, process: &TransferProcess) -> Result<(), StoreError> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            let remaining = self.failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures.store(remaining - 1, Ordering::SeqCst);
                return Err(StoreError::unavailable("save", "connection reset"));
            }
            self.inner.save(process)
        }

        fn create(&self, process: TransferProcess) -> Result<(), StoreError> {
            self.inner.create(process)
        }

        fn all(&self) -> Result<Vec<TransferProcess>, StoreError> {
            self.inner.all()
        }
    }

    /// Store whose saves only succeed if `expected` of them overlap in time
    struct RendezvousStore {
        inner: InMemoryTransferProcessStore,
        arrivals: Mutex<usize>,
        all_arrived: Condvar,
        expected: usize,
    }

    impl TransferProcessStore for RendezvousStore {
        fn load(&self, id: &ProcessId) -> Result<Option<TransferProcess>, StoreError> {
            self.inner.load(id)
        }

        fn save(&self, process: &TransferProcess) -> Result<(), StoreError> {
            let mut arrivals = self.arrivals.lock().unwrap();
            *arrivals += 1;
            self.all_arrived.notify_all();
            let (arrivals, timeout) = self
                .all_arrived
                .wait_timeout_while(arrivals, Duration::from_secs(5), |n| *n < self.expected)
                .unwrap();
            drop(arrivals);
            if timeout.timed_out() {
                return Err(StoreError::unavailable("save", "rendezvous timed out"));
            }
            self.inner.save(process)
        }

        fn create(&self, process: TransferProcess) -> Result<(), StoreError> {
            self.inner.create(process)
        }

        fn all(&self) -> Result<Vec<TransferProcess>, StoreError> {
            self.inner.all()
        }
    }

    fn process_in(id: &str, state: TransferProcessState) -> TransferProcess {
        TransferProcess::new(id, created()).with_state(state)
    }

    fn dispatcher_over(
        store: Arc<dyn TransferProcessStore>,
        listener: Arc<CountingListener>,
    ) -> CommandDispatcher {
        let registry = Arc::new(CommandHandlerRegistry::with_default_handlers().unwrap());
        CommandDispatcher::new(registry, store)
            .with_observable(TransferProcessObservable::new().with_listener(listener))
            .with_clock(Arc::new(FixedClock(now())))
    }

    fn setup(
        processes: Vec<TransferProcess>,
    ) -> (CommandDispatcher, Arc<InMemoryTransferProcessStore>, Arc<CountingListener>) {
        let store = Arc::new(InMemoryTransferProcessStore::with_processes(processes));
        let listener = Arc::new(CountingListener::default());
        let dispatcher = dispatcher_over(store.clone(), listener.clone());
        (dispatcher, store, listener)
    }

    fn stored(store: &InMemoryTransferProcessStore, id: &str) -> TransferProcess {
        store.load(&ProcessId::new(id)).unwrap().unwrap()
    }

    #[test]
    fn test_complete_started_process() {
        let (dispatcher, store, listener) =
            setup(vec![process_in("tp-1", TransferProcessState::Started)]);

        let outcome = dispatcher.apply(&TransferCommand::complete("tp-1")).unwrap();

        let process = outcome.content();
        assert_eq!(process.state, TransferProcessState::Completed);
        assert_eq!(process.updated_at, now());
        assert_eq!(*process, stored(&store, "tp-1"));
        assert_eq!(listener.changes.load(Ordering::SeqCst), 1);
        assert_eq!(listener.completed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_replayed_complete_is_silent_noop() {
        let (dispatcher, store, listener) =
            setup(vec![process_in("tp-1", TransferProcessState::Started)]);

        let first = dispatcher.apply(&TransferCommand::complete("tp-1")).unwrap();
        let after_first = stored(&store, "tp-1");
        let second = dispatcher.apply(&TransferCommand::complete("tp-1")).unwrap();

        assert!(first.succeeded());
        assert!(second.succeeded());
        assert_eq!(*second.content(), after_first);
        assert_eq!(stored(&store, "tp-1"), after_first);
        assert_eq!(listener.changes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_missing_process_is_not_found() {
        let (dispatcher, _store, listener) = setup(vec![]);

        let outcome = dispatcher
            .apply(&TransferCommand::complete("tp-missing"))
            .unwrap();

        assert!(outcome.invalid());
        assert!(outcome.first_error().contains("not found"));
        assert_eq!(
            outcome.failure_details().unwrap().kind(),
            FailureKind::NotFound
        );
        assert_eq!(listener.changes.load(Ordering::SeqCst), 0);
    }

    #[rstest]
    #[case::resume(TransferCommand::resume("tp-1"))]
    #[case::start(TransferCommand::start("tp-1"))]
    #[case::complete(TransferCommand::complete("tp-1"))]
    #[case::suspend(TransferCommand::suspend("tp-1", None))]
    #[case::fail(TransferCommand::fail("tp-1", "late fault"))]
    fn test_terminated_process_rejects_mutations(#[case] command: TransferCommand) {
        let original = process_in("tp-1", TransferProcessState::Terminated);
        let (dispatcher, store, listener) = setup(vec![original.clone()]);

        let outcome = dispatcher.apply(&command).unwrap();

        assert!(outcome.invalid());
        assert_eq!(
            outcome.failure_details().unwrap().kind(),
            FailureKind::IllegalTransition
        );
        assert_eq!(stored(&store, "tp-1"), original);
        assert_eq!(listener.changes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_invalid_command_is_rejected_before_loading() {
        let (dispatcher, store, _listener) =
            setup(vec![process_in("tp-1", TransferProcessState::Started)]);

        let outcome = dispatcher
            .apply(&TransferCommand::terminate("tp-1", ""))
            .unwrap();

        assert_eq!(
            outcome.failure_details().unwrap().kind(),
            FailureKind::Validation
        );
        assert_eq!(stored(&store, "tp-1").state, TransferProcessState::Started);
    }

    #[test]
    fn test_storage_failure_is_retryable_and_writes_nothing() {
        let original = process_in("tp-1", TransferProcessState::Started);
        let store = Arc::new(FlakyStore::new(1, vec![original.clone()]));
        let listener = Arc::new(CountingListener::default());
        let dispatcher = dispatcher_over(store.clone(), listener.clone());

        let failed = dispatcher.apply(&TransferCommand::complete("tp-1")).unwrap();
        let failure = failed.failure_details().unwrap();
        assert!(failure.is_retryable());
        assert!(failure.first_message().contains("connection reset"));
        assert_eq!(store.load(&original.id).unwrap(), Some(original.clone()));
        assert_eq!(listener.changes.load(Ordering::SeqCst), 0);

        let retried = dispatcher.apply(&TransferCommand::complete("tp-1")).unwrap();
        assert_eq!(retried.content().state, TransferProcessState::Completed);
        assert_eq!(store.saves.load(Ordering::SeqCst), 2);
        assert_eq!(listener.changes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_success_content_is_what_was_saved() {
        let (dispatcher, store, _listener) =
            setup(vec![process_in("tp-1", TransferProcessState::Initial)]);

        let outcome = dispatcher.apply(&TransferCommand::request("tp-1")).unwrap();

        assert_eq!(outcome.into_content(), stored(&store, "tp-1"));
    }

    #[test]
    fn test_distinct_ids_do_not_block_each_other() {
        let store = Arc::new(RendezvousStore {
            inner: InMemoryTransferProcessStore::with_processes(vec![
                process_in("tp-1", TransferProcessState::Started),
                process_in("tp-2", TransferProcessState::Started),
            ]),
            arrivals: Mutex::new(0),
            all_arrived: Condvar::new(),
            expected: 2,
        });
        let listener = Arc::new(CountingListener::default());
        let dispatcher = Arc::new(dispatcher_over(store.clone(), listener));

        let handles: Vec<_> = ["tp-1", "tp-2"]
            .into_iter()
            .map(|id| {
                let dispatcher = Arc::clone(&dispatcher);
                thread::spawn(move || dispatcher.apply(&TransferCommand::complete(id)).unwrap())
            })
            .collect();

        for handle in handles {
            let outcome = handle.join().unwrap();
            assert_eq!(outcome.content().state, TransferProcessState::Completed);
        }
    }

    #[test]
    fn test_same_id_commands_serialize() {
        let (dispatcher, store, listener) =
            setup(vec![process_in("tp-1", TransferProcessState::Started)]);
        let dispatcher = Arc::new(dispatcher);

        let commands = [
            TransferCommand::complete("tp-1"),
            TransferCommand::terminate("tp-1", "operator abort"),
        ];
        let handles: Vec<_> = commands
            .into_iter()
            .map(|command| {
                let dispatcher = Arc::clone(&dispatcher);
                thread::spawn(move || dispatcher.apply(&command).unwrap())
            })
            .collect();
        let outcomes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let winners: Vec<_> = outcomes.iter().filter(|o| o.succeeded()).collect();
        assert_eq!(winners.len(), 1);
        assert_eq!(*winners[0].content(), stored(&store, "tp-1"));
        assert_eq!(stored(&store, "tp-1").state_count, 1);
        assert_eq!(listener.changes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_many_concurrent_replays_commit_once() {
        let (dispatcher, store, listener) =
            setup(vec![process_in("tp-1", TransferProcessState::Started)]);
        let dispatcher = Arc::new(dispatcher);

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let dispatcher = Arc::clone(&dispatcher);
                thread::spawn(move || dispatcher.apply(&TransferCommand::complete("tp-1")).unwrap())
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap().succeeded());
        }
        assert_eq!(stored(&store, "tp-1").state, TransferProcessState::Completed);
        assert_eq!(stored(&store, "tp-1").state_count, 1);
        assert_eq!(listener.changes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_handler_changing_id_is_a_fault() {
        struct RenamingHandler;

        impl CommandHandler for RenamingHandler {
            fn kind(&self) -> CommandKind {
                CommandKind::Complete
            }

            fn handle(
                &self,
                mut process: TransferProcess,
                _command: &TransferCommand,
                _at: DateTime<Utc>,
            ) -> CommandOutcome<TransferProcess> {
                process.id = ProcessId::new("someone-else");
                CommandOutcome::success(process)
            }
        }

        let mut builder = CommandHandlerRegistry::builder();
        builder
            .register(RenamingHandler)
            .and_then(|b| b.register(crate::core::handlers::RequestTransferHandler))
            .and_then(|b| b.register(crate::core::handlers::StartTransferHandler))
            .and_then(|b| b.register(crate::core::handlers::SuspendTransferHandler))
            .and_then(|b| b.register(crate::core::handlers::ResumeTransferHandler))
            .and_then(|b| b.register(crate::core::handlers::TerminateTransferHandler))
            .and_then(|b| b.register(crate::core::handlers::FailTransferHandler))
            .unwrap();
        let store = Arc::new(InMemoryTransferProcessStore::with_processes(vec![
            process_in("tp-1", TransferProcessState::Started),
        ]));
        let dispatcher = CommandDispatcher::new(Arc::new(builder.build().unwrap()), store.clone());

        let fault = dispatcher
            .apply(&TransferCommand::complete("tp-1"))
            .unwrap_err();

        assert!(matches!(fault, DispatchFault::HandlerIdMismatch { .. }));
        assert_eq!(stored(&store, "tp-1").state, TransferProcessState::Started);
    }
}
