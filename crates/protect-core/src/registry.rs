//! ProtectionRegistry: the TTL-indexed registry and its expiry policy.
//!
//! Every operation takes the store lock, reads the clock once, opens a
//! store transaction, sweeps expired records and then performs its read
//! or write before committing and releasing the lock. Expiry is lazy: a
//! record whose end time has passed stays physically present until the
//! next operation (or a background sweep) touches the store.

use crate::clock::{Clock, SystemClock};
use crate::errors::RegistryError;
use crate::model::{DefenseLevel, ProtectionId, ProtectionRecord, Ttl};
use crate::store::{MemoryStore, RecordStore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// What `set` does when a live record already holds the id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Replace defense, start and end of the existing record.
    #[default]
    Upsert,
    /// Fail with `DuplicateId` and leave the existing record unchanged.
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetAction {
    Created,
    Replaced,
}

/// Result of a successful `set`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetOutcome {
    pub record: ProtectionRecord,
    pub action: SetAction,
}

pub struct ProtectionRegistry {
    store: Mutex<Box<dyn RecordStore>>,
    policy: DuplicatePolicy,
    clock: Arc<dyn Clock>,
}

impl ProtectionRegistry {
    pub fn new(store: Box<dyn RecordStore>, policy: DuplicatePolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            store: Mutex::new(store),
            policy,
            clock,
        }
    }

    /// In-memory registry on the system clock.
    pub fn in_memory(policy: DuplicatePolicy) -> Self {
        Self::new(Box::new(MemoryStore::new()), policy, Arc::new(SystemClock))
    }

    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    /// Protect `id` for `ttl` starting now.
    pub fn set(
        &self,
        id: ProtectionId,
        defense: DefenseLevel,
        ttl: Ttl,
    ) -> Result<SetOutcome, RegistryError> {
        let mut store = self.lock()?;
        let now = self.clock.now();
        let policy = self.policy;
        debug!(%id, defense = defense.get(), ttl = ttl.as_secs(), "SET");

        Self::atomically(&mut **store, |store| {
            Self::sweep_locked(store, now)?;

            let action = match (store.get(id), policy) {
                (Some(current), DuplicatePolicy::Reject) => {
                    warn!(%id, end = %current.end, "rejecting duplicate protection");
                    return Err(RegistryError::DuplicateId { id });
                }
                (Some(_), DuplicatePolicy::Upsert) => SetAction::Replaced,
                (None, _) => SetAction::Created,
            };

            let record = ProtectionRecord::new(id, defense, ttl, now);
            store.put(record)?;
            Ok(SetOutcome { record, action })
        })
    }

    /// Every live record, ascending by id.
    pub fn pull(&self) -> Result<Vec<ProtectionRecord>, RegistryError> {
        let mut store = self.lock()?;
        let now = self.clock.now();
        debug!("PULL");

        Self::atomically(&mut **store, |store| {
            Self::sweep_locked(store, now)?;
            Ok(store.records())
        })
    }

    /// Remove expired records; returns the number removed.
    pub fn sweep(&self) -> Result<usize, RegistryError> {
        let mut store = self.lock()?;
        let now = self.clock.now();
        Self::atomically(&mut **store, |store| Self::sweep_locked(store, now))
    }

    /// Number of records physically held, including any not yet swept.
    pub fn held(&self) -> Result<usize, RegistryError> {
        let mut store = self.lock()?;
        Self::atomically(&mut **store, |store| Ok(store.len()))
    }

    /// Release the backing store.
    pub fn close(self) -> Result<(), RegistryError> {
        let store = self
            .store
            .into_inner()
            .map_err(|_| RegistryError::StoreUnavailable("registry lock poisoned".to_string()))?;
        let backend = store.backend();
        store.close()?;
        info!(backend, "protection registry closed");
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Box<dyn RecordStore>>, RegistryError> {
        self.store
            .lock()
            .map_err(|_| RegistryError::StoreUnavailable("registry lock poisoned".to_string()))
    }

    /// Run `op` between `begin` and `commit`. Only a store failure rolls
    /// back; a rejected duplicate still commits the sweep that preceded it.
    fn atomically<T>(
        store: &mut dyn RecordStore,
        op: impl FnOnce(&mut dyn RecordStore) -> Result<T, RegistryError>,
    ) -> Result<T, RegistryError> {
        store.begin()?;
        match op(&mut *store) {
            Err(e @ RegistryError::StoreUnavailable(_)) => {
                store.rollback();
                Err(e)
            }
            result => {
                store.commit()?;
                result
            }
        }
    }

    fn sweep_locked(store: &mut dyn RecordStore, now: DateTime<Utc>) -> Result<usize, RegistryError> {
        let removed = store.remove_expired(now)?;
        if removed > 0 {
            info!(removed, remaining = store.len(), "swept expired protections");
        }
        Ok(removed)
    }
}
