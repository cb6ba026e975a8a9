//! Backing stores for the protection registry.
//!
//! Both backends expose the same observable behavior; the sqlite backend
//! additionally survives restarts by rehydrating its view from the table.

mod memory;
mod schema;
mod sqlite;

pub use memory::MemoryStore;
pub use schema::PROTECTION_SCHEMA;
pub use sqlite::SqliteStore;

use crate::errors::RegistryError;
use crate::model::{ProtectionId, ProtectionRecord};
use chrono::{DateTime, Utc};

/// Record collection owned by a registry.
///
/// Callers serialize access (the registry holds it behind a mutex) and
/// bracket each sweep-then-act sequence with `begin` / `commit`. A backend
/// shared with other processes re-reads its state in `begin` and holds its
/// write lock until `commit` or `rollback`.
pub trait RecordStore: Send {
    fn begin(&mut self) -> Result<(), RegistryError> {
        Ok(())
    }

    fn commit(&mut self) -> Result<(), RegistryError> {
        Ok(())
    }

    /// Discard everything since `begin`.
    fn rollback(&mut self) {}

    fn get(&self, id: ProtectionId) -> Option<ProtectionRecord>;

    /// All held records in ascending id order.
    fn records(&self) -> Vec<ProtectionRecord>;

    /// Insert or replace the record for `record.id`.
    fn put(&mut self, record: ProtectionRecord) -> Result<(), RegistryError>;

    /// Remove every record expired at `now`; returns how many were removed.
    fn remove_expired(&mut self, now: DateTime<Utc>) -> Result<usize, RegistryError>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn backend(&self) -> &'static str;

    fn close(self: Box<Self>) -> Result<(), RegistryError> {
        Ok(())
    }
}
