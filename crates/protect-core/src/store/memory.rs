use super::RecordStore;
use crate::errors::RegistryError;
use crate::model::{ProtectionId, ProtectionRecord};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Process-lifetime store; nothing survives a restart.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    records: BTreeMap<ProtectionId, ProtectionRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for MemoryStore {
    fn get(&self, id: ProtectionId) -> Option<ProtectionRecord> {
        self.records.get(&id).copied()
    }

    fn records(&self) -> Vec<ProtectionRecord> {
        self.records.values().copied().collect()
    }

    fn put(&mut self, record: ProtectionRecord) -> Result<(), RegistryError> {
        self.records.insert(record.id, record);
        Ok(())
    }

    fn remove_expired(&mut self, now: DateTime<Utc>) -> Result<usize, RegistryError> {
        let before = self.records.len();
        self.records.retain(|_, rec| rec.is_live_at(now));
        Ok(before - self.records.len())
    }

    fn len(&self) -> usize {
        self.records.len()
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
