//! Transfer process record and lifecycle states
//!
//! A `TransferProcess` is owned by the store. The dispatcher only ever holds a
//! copy fetched for the duration of a single command.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Transfer process identifier
///
/// Stable and unique per process. Ordered so that output listings are
/// deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessId(String);

impl ProcessId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProcessId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ProcessId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Lifecycle states of a transfer process
///
/// COMPLETED, TERMINATED and ERROR are terminal: once reached, no command
/// other than an idempotent replay of the command that led there succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferProcessState {
    /// Accepted, nothing requested from the counterparty yet
    Initial,

    /// Transfer request sent to or received from the counterparty
    Requested,

    /// Data transfer is running
    Started,

    /// Paused by either party; may be resumed
    Suspended,

    /// Terminal: transfer finished successfully
    Completed,

    /// Terminal: transfer aborted by either party
    Terminated,

    /// Terminal: unrecoverable fault
    Error,
}

impl TransferProcessState {
    pub const ALL: [TransferProcessState; 7] = [
        TransferProcessState::Initial,
        TransferProcessState::Requested,
        TransferProcessState::Started,
        TransferProcessState::Suspended,
        TransferProcessState::Completed,
        TransferProcessState::Terminated,
        TransferProcessState::Error,
    ];

    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransferProcessState::Completed
                | TransferProcessState::Terminated
                | TransferProcessState::Error
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransferProcessState::Initial => "INITIAL",
            TransferProcessState::Requested => "REQUESTED",
            TransferProcessState::Started => "STARTED",
            TransferProcessState::Suspended => "SUSPENDED",
            TransferProcessState::Completed => "COMPLETED",
            TransferProcessState::Terminated => "TERMINATED",
            TransferProcessState::Error => "ERROR",
        }
    }
}

impl fmt::Display for TransferProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransferProcessState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TransferProcessState::ALL
            .into_iter()
            .find(|state| state.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown transfer process state '{}'", s))
    }
}

/// Lifecycle aggregate for one data transfer between two connectors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferProcess {
    /// Stable, unique identifier
    pub id: ProcessId,

    /// Current lifecycle state
    pub state: TransferProcessState,

    /// Number of committed state transitions
    ///
    /// Idempotent replays do not bump this counter.
    pub state_count: u32,

    /// Timestamp of the last committed transition (or creation)
    pub updated_at: DateTime<Utc>,

    /// Reason recorded by a terminate or fault command
    pub error_detail: Option<String>,
}

impl TransferProcess {
    /// Create a process in the INITIAL state
    ///
    /// Creation happens when a transfer request is accepted, which is outside
    /// the command engine; the engine only ever mutates existing processes.
    pub fn new(id: impl Into<ProcessId>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            state: TransferProcessState::Initial,
            state_count: 0,
            updated_at: created_at,
            error_detail: None,
        }
    }

    /// Builder-style helper to place a process in an arbitrary state
    pub fn with_state(mut self, state: TransferProcessState) -> Self {
        self.state = state;
        self
    }

    /// Move to `state`, stamping the transition time and bumping the counter
    pub fn transition_to(&mut self, state: TransferProcessState, at: DateTime<Utc>) {
        self.state = state;
        self.state_count = self.state_count.saturating_add(1);
        self.updated_at = at;
    }
}
