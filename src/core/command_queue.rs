//! Command queue with bounded retry
//!
//! Commands submitted to a `CommandProcessor` are buffered in a lock-free FIFO
//! (`crossbeam_queue::SegQueue`) and applied through the dispatcher one at a
//! time. A command that fails with a retryable storage failure goes back to the
//! tail of the queue until it has been attempted `RetryPolicy::max_attempts`
//! times. Domain failures (validation, not found, illegal transition) are final
//! and are never retried.
//!
//! # Thread Safety
//!
//! `SegQueue` supports concurrent push and pop, so several workers may share a
//! `CommandQueue`. Ordering across workers is then only FIFO per pop; callers
//! that need per-process ordering keep one processor per partition, as the
//! batch processor does.

use super::dispatcher::CommandDispatcher;
use crate::types::{CommandOutcome, DispatchFault, Failure, TransferCommand, TransferProcess};
use crossbeam_queue::SegQueue;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// How often a retryable command is attempted before it is given up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3 }
    }
}

impl RetryPolicy {
    /// Create a policy; zero falls back to the default with a warning
    pub fn new(max_attempts: u32) -> Self {
        if max_attempts == 0 {
            let default = Self::default();
            warn!(
                max_attempts,
                default = default.max_attempts,
                "Invalid max_attempts, using default"
            );
            return default;
        }
        Self { max_attempts }
    }
}

/// A command waiting in the queue, with the number of attempts made so far
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedCommand {
    pub command: TransferCommand,
    pub attempts: u32,
}

impl QueuedCommand {
    pub fn new(command: TransferCommand) -> Self {
        Self {
            command,
            attempts: 0,
        }
    }
}

/// Unbounded lock-free FIFO of pending commands
#[derive(Debug, Default)]
pub struct CommandQueue {
    pending: SegQueue<QueuedCommand>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, command: TransferCommand) {
        self.pending.push(QueuedCommand::new(command));
    }

    pub fn requeue(&self, queued: QueuedCommand) {
        self.pending.push(queued);
    }

    pub fn pop(&self) -> Option<QueuedCommand> {
        self.pending.pop()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Result of processing one queued command
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessingStatus {
    /// Applied (or an idempotent replay)
    Processed(TransferProcess),
    /// Domain failure; discarded
    Rejected(Failure),
    /// Retryable failure; back on the queue after `attempts` tries
    Requeued { attempts: u32 },
    /// Retryable failure with no attempts left; discarded
    Exhausted(Failure),
}

/// Tally of a `drain` run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DrainReport {
    pub processed: usize,
    pub rejected: usize,
    pub retried: usize,
    pub exhausted: usize,
}

impl DrainReport {
    fn record(&mut self, status: &ProcessingStatus) {
        match status {
            ProcessingStatus::Processed(_) => self.processed += 1,
            ProcessingStatus::Rejected(_) => self.rejected += 1,
            ProcessingStatus::Requeued { .. } => self.retried += 1,
            ProcessingStatus::Exhausted(_) => self.exhausted += 1,
        }
    }

    /// Fold another report into this one
    pub fn absorb(&mut self, other: DrainReport) {
        self.processed += other.processed;
        self.rejected += other.rejected;
        self.retried += other.retried;
        self.exhausted += other.exhausted;
    }
}

/// Applies queued commands through a dispatcher, retrying storage failures
#[derive(Debug)]
pub struct CommandProcessor {
    dispatcher: Arc<CommandDispatcher>,
    queue: CommandQueue,
    policy: RetryPolicy,
}

impl CommandProcessor {
    pub fn new(dispatcher: Arc<CommandDispatcher>, policy: RetryPolicy) -> Self {
        Self {
            dispatcher,
            queue: CommandQueue::new(),
            policy,
        }
    }

    pub fn enqueue(&self, command: TransferCommand) {
        self.queue.push(command);
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Pop and apply the next command
    ///
    /// # Returns
    ///
    /// * `Ok(None)` - the queue was empty
    /// * `Ok(Some(status))` - what happened to the command
    /// * `Err(DispatchFault)` - configuration fault; the command is dropped
    pub fn process_next(&self) -> Result<Option<ProcessingStatus>, DispatchFault> {
        let Some(mut queued) = self.queue.pop() else {
            return Ok(None);
        };
        queued.attempts += 1;

        let status = match self.dispatcher.apply(&queued.command)? {
            CommandOutcome::Success(process) => {
                debug!(command = %queued.command, state = %process.state, "Command processed");
                ProcessingStatus::Processed(process)
            }
            CommandOutcome::Failure(failure) if !failure.is_retryable() => {
                debug!(command = %queued.command, %failure, "Command discarded");
                ProcessingStatus::Rejected(failure)
            }
            CommandOutcome::Failure(failure) if queued.attempts < self.policy.max_attempts => {
                warn!(
                    command = %queued.command,
                    attempts = queued.attempts,
                    max_attempts = self.policy.max_attempts,
                    %failure,
                    "Retryable failure, requeueing"
                );
                let attempts = queued.attempts;
                self.queue.requeue(queued);
                ProcessingStatus::Requeued { attempts }
            }
            CommandOutcome::Failure(failure) => {
                error!(
                    command = %queued.command,
                    attempts = queued.attempts,
                    %failure,
                    "Retry limit exceeded, giving up"
                );
                ProcessingStatus::Exhausted(failure)
            }
        };

        Ok(Some(status))
    }

    /// Process until the queue is empty
    pub fn drain(&self) -> Result<DrainReport, DispatchFault> {
        let mut report = DrainReport::default();
        while let Some(status) = self.process_next()? {
            report.record(&status);
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::registry::CommandHandlerRegistry;
    use crate::core::store::InMemoryTransferProcessStore;
    use crate::core::traits::TransferProcessStore;
    use crate::types::{FailureKind, ProcessId, StoreError, TransferProcessState};
    use chrono::Utc;
    use rstest::rstest;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Store whose saves fail a fixed number of times before succeeding
    struct UnreliableStore {
        inner: InMemoryTransferProcessStore,
        failures_left: AtomicU32,
    }

    impl TransferProcessStore for UnreliableStore {
        fn load(&self, id: &ProcessId) -> Result<Option<TransferProcess>, StoreError> {
            self.inner.load(id)
        }

        fn save(&self, process: &TransferProcess) -> Result<(), StoreError> {
            let left = self.failures_left.load(Ordering::SeqCst);
            if left > 0 {
                self.failures_left.store(left - 1, Ordering::SeqCst);
                return Err(StoreError::unavailable("save", "timeout"));
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

    fn processor_with(save_failures: u32, policy: RetryPolicy) -> (CommandProcessor, Arc<UnreliableStore>) {
        let store = Arc::new(UnreliableStore {
            inner: InMemoryTransferProcessStore::with_processes(vec![
                TransferProcess::new("tp-1", Utc::now()).with_state(TransferProcessState::Started),
            ]),
            failures_left: AtomicU32::new(save_failures),
        });
        let registry = Arc::new(CommandHandlerRegistry::with_default_handlers().unwrap());
        let dispatcher = Arc::new(CommandDispatcher::new(registry, store.clone()));
        (CommandProcessor::new(dispatcher, policy), store)
    }

    fn state_of(store: &UnreliableStore) -> TransferProcessState {
        store.load(&ProcessId::new("tp-1")).unwrap().unwrap().state
    }

    #[test]
    fn test_empty_queue_yields_none() {
        let (processor, _store) = processor_with(0, RetryPolicy::default());
        assert_eq!(processor.process_next().unwrap(), None);
    }

    #[test]
    fn test_success_is_processed() {
        let (processor, store) = processor_with(0, RetryPolicy::default());
        processor.enqueue(TransferCommand::complete("tp-1"));

        let status = processor.process_next().unwrap().unwrap();

        assert!(matches!(status, ProcessingStatus::Processed(ref p) if p.state == TransferProcessState::Completed));
        assert_eq!(state_of(&store), TransferProcessState::Completed);
        assert_eq!(processor.pending(), 0);
    }

    #[test]
    fn test_domain_failure_is_not_retried() {
        let (processor, _store) = processor_with(0, RetryPolicy::default());
        processor.enqueue(TransferCommand::request("tp-1"));

        let status = processor.process_next().unwrap().unwrap();

        match status {
            ProcessingStatus::Rejected(failure) => {
                assert_eq!(failure.kind(), FailureKind::IllegalTransition)
            }
            other => panic!("expected rejection, got {:?}", other),
        }
        assert_eq!(processor.pending(), 0);
    }

    #[test]
    fn test_unknown_process_is_not_retried() {
        let (processor, _store) = processor_with(0, RetryPolicy::default());
        processor.enqueue(TransferCommand::complete("tp-ghost"));

        let report = processor.drain().unwrap();

        assert_eq!(
            report,
            DrainReport { processed: 0, rejected: 1, retried: 0, exhausted: 0 }
        );
        assert_eq!(processor.pending(), 0);
    }

    #[test]
    fn test_storage_failure_is_requeued() {
        let (processor, _store) = processor_with(1, RetryPolicy::default());
        processor.enqueue(TransferCommand::complete("tp-1"));

        let status = processor.process_next().unwrap().unwrap();

        assert_eq!(status, ProcessingStatus::Requeued { attempts: 1 });
        assert_eq!(processor.pending(), 1);
    }

    #[rstest]
    #[case::recovers_on_second_try(1, 3, DrainReport { processed: 1, rejected: 0, retried: 1, exhausted: 0 }, TransferProcessState::Completed)]
    #[case::recovers_on_last_try(2, 3, DrainReport { processed: 1, rejected: 0, retried: 2, exhausted: 0 }, TransferProcessState::Completed)]
    #[case::gives_up(3, 3, DrainReport { processed: 0, rejected: 0, retried: 2, exhausted: 1 }, TransferProcessState::Started)]
    #[case::single_attempt(1, 1, DrainReport { processed: 0, rejected: 0, retried: 0, exhausted: 1 }, TransferProcessState::Started)]
    fn test_drain_with_retries(
        #[case] save_failures: u32,
        #[case] max_attempts: u32,
        #[case] expected: DrainReport,
        #[case] final_state: TransferProcessState,
    ) {
        let (processor, store) = processor_with(save_failures, RetryPolicy::new(max_attempts));
        processor.enqueue(TransferCommand::complete("tp-1"));

        let report = processor.drain().unwrap();

        assert_eq!(report, expected);
        assert_eq!(state_of(&store), final_state);
        assert_eq!(processor.pending(), 0);
    }

    #[test]
    fn test_drain_preserves_fifo_order() {
        let (processor, store) = processor_with(0, RetryPolicy::default());
        processor.enqueue(TransferCommand::suspend("tp-1", None));
        processor.enqueue(TransferCommand::resume("tp-1"));
        processor.enqueue(TransferCommand::complete("tp-1"));

        let report = processor.drain().unwrap();

        assert_eq!(report.processed, 3);
        assert_eq!(state_of(&store), TransferProcessState::Completed);
    }

    #[test]
    fn test_zero_max_attempts_uses_default() {
        assert_eq!(RetryPolicy::new(0), RetryPolicy::default());
        assert_eq!(RetryPolicy::new(5).max_attempts, 5);
    }

    #[test]
    fn test_report_absorb() {
        let mut total = DrainReport {
            processed: 1,
            ..Default::default()
        };
        total.absorb(DrainReport {
            processed: 2,
            rejected: 1,
            retried: 3,
            exhausted: 1,
        });
        assert_eq!(
            total,
            DrainReport {
                processed: 3,
                rejected: 1,
                retried: 3,
                exhausted: 1
            }
        );
    }
}
