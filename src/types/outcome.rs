//! Explicit success/failure outcome of applying a command
//!
//! `CommandOutcome<T>` is either `Success(T)` or `Failure(Failure)`. A failure
//! always carries at least one message; there is no way to build an empty one
//! through the public API.
//!
//! # Failure Categories
//!
//! - **Validation**: the command payload is malformed
//! - **NotFound**: the target process does not exist
//! - **IllegalTransition**: the state machine rejected the command
//! - **Storage**: persisting the new state failed; resubmitting the same
//!   command is safe

use std::fmt;

/// Category of an expected (non-fatal) failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Validation,
    NotFound,
    IllegalTransition,
    Storage,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Validation => "validation",
            FailureKind::NotFound => "not_found",
            FailureKind::IllegalTransition => "illegal_transition",
            FailureKind::Storage => "storage",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One or more failure messages of a single category
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    kind: FailureKind,
    // Invariant: never empty.
    messages: Vec<String>,
}

impl Failure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            messages: vec![message.into()],
        }
    }

    /// Build a failure from a list of messages
    ///
    /// Returns `None` when the list is empty, which lets validation code
    /// collect problems and only fail if it found any.
    pub fn from_messages(kind: FailureKind, messages: Vec<String>) -> Option<Self> {
        if messages.is_empty() {
            None
        } else {
            Some(Self { kind, messages })
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.messages.push(message.into());
        self
    }

    /// Append the messages of another failure, keeping this failure's kind
    pub fn merge(mut self, other: Failure) -> Self {
        self.messages.extend(other.messages);
        self
    }

    pub fn kind(&self) -> FailureKind {
        self.kind
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn first_message(&self) -> &str {
        &self.messages[0]
    }

    /// Whether resubmitting the identical command may succeed
    pub fn is_retryable(&self) -> bool {
        self.kind == FailureKind::Storage
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.messages.join("; "))
    }
}

impl std::error::Error for Failure {}

/// Outcome of a command: new content on success, messages on failure
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub enum CommandOutcome<T> {
    Success(T),
    Failure(Failure),
}

impl<T> CommandOutcome<T> {
    pub fn success(content: T) -> Self {
        CommandOutcome::Success(content)
    }

    pub fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        CommandOutcome::Failure(Failure::new(kind, message))
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::failure(FailureKind::NotFound, message)
    }

    pub fn illegal_transition(message: impl Into<String>) -> Self {
        Self::failure(FailureKind::IllegalTransition, message)
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::failure(FailureKind::Storage, message)
    }

    /// True iff this outcome carries failure messages
    pub fn invalid(&self) -> bool {
        matches!(self, CommandOutcome::Failure(_))
    }

    pub fn succeeded(&self) -> bool {
        !self.invalid()
    }

    /// The success content
    ///
    /// # Panics
    ///
    /// Panics when called on a failure. Reading content from a failed outcome
    /// is a logic error in the caller, not an expected condition.
    pub fn content(&self) -> &T {
        match self {
            CommandOutcome::Success(content) => content,
            CommandOutcome::Failure(failure) => {
                panic!("content() called on a failed outcome: {}", failure)
            }
        }
    }

    /// Consume the outcome, returning the success content
    ///
    /// # Panics
    ///
    /// Panics when called on a failure, like [`CommandOutcome::content`].
    pub fn into_content(self) -> T {
        match self {
            CommandOutcome::Success(content) => content,
            CommandOutcome::Failure(failure) => {
                panic!("into_content() called on a failed outcome: {}", failure)
            }
        }
    }

    /// The first failure message
    ///
    /// # Panics
    ///
    /// Panics when called on a success.
    pub fn first_error(&self) -> &str {
        match self {
            CommandOutcome::Success(_) => panic!("first_error() called on a successful outcome"),
            CommandOutcome::Failure(failure) => failure.first_message(),
        }
    }

    pub fn failure_details(&self) -> Option<&Failure> {
        match self {
            CommandOutcome::Success(_) => None,
            CommandOutcome::Failure(failure) => Some(failure),
        }
    }

    pub fn map<U, F>(self, f: F) -> CommandOutcome<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            CommandOutcome::Success(content) => CommandOutcome::Success(f(content)),
            CommandOutcome::Failure(failure) => CommandOutcome::Failure(failure),
        }
    }

    /// Bridge to `std::result::Result` so callers can use `?`
    pub fn into_result(self) -> Result<T, Failure> {
        match self {
            CommandOutcome::Success(content) => Ok(content),
            CommandOutcome::Failure(failure) => Err(failure),
        }
    }
}

impl<T> From<Result<T, Failure>> for CommandOutcome<T> {
    fn from(result: Result<T, Failure>) -> Self {
        match result {
            Ok(content) => CommandOutcome::Success(content),
            Err(failure) => CommandOutcome::Failure(failure),
        }
    }
}
