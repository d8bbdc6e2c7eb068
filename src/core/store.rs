//! Thread-safe in-memory transfer process store
//!
//! This module provides the `InMemoryTransferProcessStore` struct, which keeps
//! transfer processes in a `DashMap` so that many workers can load and save
//! different processes concurrently.
//!
//! # Design
//!
//! `DashMap` shards its entries internally, so operations on different process
//! ids rarely contend. The store hands out clones; callers never hold a lock
//! on an entry across their own logic. Serializing load → transition → save
//! for one id is the dispatcher's job, not the store's.

use super::traits::TransferProcessStore;
use crate::types::{ProcessId, StoreError, TransferProcess};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// In-memory store backed by `DashMap`
#[derive(Debug, Default)]
pub struct InMemoryTransferProcessStore {
    /// Transfer processes by id
    processes: DashMap<ProcessId, TransferProcess>,
}

impl InMemoryTransferProcessStore {
    pub fn new() -> Self {
        Self {
            processes: DashMap::new(),
        }
    }

    /// Build a store pre-populated with `processes`
    ///
    /// Later entries with a duplicate id overwrite earlier ones.
    pub fn with_processes(processes: impl IntoIterator<Item = TransferProcess>) -> Self {
        let store = Self::new();
        for process in processes {
            store.processes.insert(process.id.clone(), process);
        }
        store
    }

    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }
}

impl TransferProcessStore for InMemoryTransferProcessStore {
    fn load(&self, id: &ProcessId) -> Result<Option<TransferProcess>, StoreError> {
        Ok(self.processes.get(id).map(|entry| entry.value().clone()))
    }

    fn save(&self, process: &TransferProcess) -> Result<(), StoreError> {
        self.processes.insert(process.id.clone(), process.clone());
        Ok(())
    }

    fn create(&self, process: TransferProcess) -> Result<(), StoreError> {
        match self.processes.entry(process.id.clone()) {
            Entry::Occupied(_) => Err(StoreError::already_exists(&process.id)),
            Entry::Vacant(slot) => {
                slot.insert(process);
                Ok(())
            }
        }
    }

    fn all(&self) -> Result<Vec<TransferProcess>, StoreError> {
        Ok(self
            .processes
            .iter()
            .map(|entry| entry.value().clone())
            .collect())
    }
}
