//! Protection record data model.
//!
//! Range-checked value types (`DefenseLevel`, `Ttl`) make the registry's
//! preconditions hold by construction: once a `Ttl` exists it is in
//! `1..=3600`, so `end > start` for every record built from it.

use crate::errors::RegistryError;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const MIN_DEFENSE: u8 = 1;
pub const MAX_DEFENSE: u8 = 3;
pub const MIN_TTL_SECS: u32 = 1;
pub const MAX_TTL_SECS: u32 = 3600;

/// Caller-supplied object identifier; primary key of the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProtectionId(pub i64);

impl fmt::Display for ProtectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ProtectionId {
    fn from(id: i64) -> Self {
        ProtectionId(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DefenseLevel(u8);

impl DefenseLevel {
    pub fn new(level: i64) -> Result<Self, RegistryError> {
        if (MIN_DEFENSE as i64..=MAX_DEFENSE as i64).contains(&level) {
            Ok(DefenseLevel(level as u8))
        } else {
            Err(RegistryError::invalid_input(
                "$.DEFENSE",
                format!("{level} is outside {MIN_DEFENSE}..={MAX_DEFENSE}"),
            ))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

/// Time-to-live in whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ttl(u32);

impl Ttl {
    pub fn from_secs(secs: i64) -> Result<Self, RegistryError> {
        if (MIN_TTL_SECS as i64..=MAX_TTL_SECS as i64).contains(&secs) {
            Ok(Ttl(secs as u32))
        } else {
            Err(RegistryError::invalid_input(
                "$.TTL",
                format!("{secs} is outside {MIN_TTL_SECS}..={MAX_TTL_SECS}"),
            ))
        }
    }

    pub fn as_secs(self) -> u32 {
        self.0
    }

    pub fn as_delta(self) -> TimeDelta {
        TimeDelta::seconds(i64::from(self.0))
    }
}

/// One protection entry. All mutable fields are replaced together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtectionRecord {
    pub id: ProtectionId,
    pub defense: DefenseLevel,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ProtectionRecord {
    pub fn new(id: ProtectionId, defense: DefenseLevel, ttl: Ttl, now: DateTime<Utc>) -> Self {
        Self {
            id,
            defense,
            start: now,
            end: now + ttl.as_delta(),
        }
    }

    /// Live while `now` is strictly before `end`.
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        now < self.end
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_live_at(now)
    }
}
