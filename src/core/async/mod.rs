//! Concurrent replay components
//!
//! The command path itself is already thread-safe (`CommandDispatcher` plus a
//! `DashMap` store). This module adds the batch layer that fans records out to
//! tokio tasks.
//!
//! # Thread Safety
//!
//! - Records for different processes proceed in parallel
//! - Records for the same process stay on one task, in log order
//! - No global locks; the only lock is the dispatcher's per-process mutex

pub mod batch_processor;

pub use batch_processor::BatchProcessor;
