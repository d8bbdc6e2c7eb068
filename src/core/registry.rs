//! Command handler registry
//!
//! Maps each command kind to exactly one handler. The registry is composed
//! once at startup through `RegistryBuilder` and is immutable afterwards, so
//! lookups need no synchronization.
//!
//! # Composition Rules
//!
//! - Binding a second handler to a kind fails immediately
//! - Sealing the builder fails if any kind is left unbound
//! - Lookup is by exact kind only

use super::handlers::{
    CompleteTransferHandler, FailTransferHandler, RequestTransferHandler,
    ResumeTransferHandler, StartTransferHandler, SuspendTransferHandler,
    TerminateTransferHandler,
};
use super::traits::CommandHandler;
use crate::types::{CommandKind, RegistryError};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Startup-time builder for a `CommandHandlerRegistry`
#[derive(Default)]
pub struct RegistryBuilder {
    handlers: HashMap<CommandKind, Arc<dyn CommandHandler>>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `handler` to the kind it reports
    ///
    /// # Returns
    ///
    /// * `Ok(&mut Self)` - bound; further registrations can be chained with `?`
    /// * `Err(RegistryError::DuplicateHandler)` - the kind is already bound;
    ///   the existing binding is kept
    pub fn register<H>(&mut self, handler: H) -> Result<&mut Self, RegistryError>
    where
        H: CommandHandler + 'static,
    {
        let kind = handler.kind();
        if self.handlers.contains_key(&kind) {
            return Err(RegistryError::DuplicateHandler { kind });
        }
        self.handlers.insert(kind, Arc::new(handler));
        Ok(self)
    }

    /// Seal the registry
    ///
    /// # Returns
    ///
    /// * `Ok(CommandHandlerRegistry)` - every command kind has a handler
    /// * `Err(RegistryError::Incomplete)` - listing every unbound kind
    pub fn build(self) -> Result<CommandHandlerRegistry, RegistryError> {
        let missing: Vec<CommandKind> = CommandKind::ALL
            .into_iter()
            .filter(|kind| !self.handlers.contains_key(kind))
            .collect();

        if !missing.is_empty() {
            return Err(RegistryError::Incomplete { missing });
        }

        Ok(CommandHandlerRegistry {
            handlers: self.handlers,
        })
    }
}

/// Immutable kind → handler mapping
#[derive(Clone)]
pub struct CommandHandlerRegistry {
    handlers: HashMap<CommandKind, Arc<dyn CommandHandler>>,
}

impl CommandHandlerRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Registry with the built-in handler for every command kind
    pub fn with_default_handlers() -> Result<Self, RegistryError> {
        let mut builder = Self::builder();
        builder
            .register(RequestTransferHandler)?
            .register(StartTransferHandler)?
            .register(SuspendTransferHandler)?
            .register(ResumeTransferHandler)?
            .register(CompleteTransferHandler)?
            .register(TerminateTransferHandler)?
            .register(FailTransferHandler)?;
        builder.build()
    }

    /// Exact-kind lookup
    pub fn resolve(&self, kind: CommandKind) -> Option<&dyn CommandHandler> {
        self.handlers.get(&kind).map(|handler| handler.as_ref())
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for CommandHandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.handlers.keys().copied().collect();
        kinds.sort();
        f.debug_struct("CommandHandlerRegistry")
            .field("kinds", &kinds)
            .finish()
    }
}
