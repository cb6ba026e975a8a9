use crate::clock::{Clock, SystemClock};
use crate::errors::RegistryError;
use crate::registry::{DuplicatePolicy, ProtectionRegistry};
use crate::store::{MemoryStore, RecordStore, SqliteStore};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Default)]
#[serde(default)]
pub struct ProtectConfig {
    /// "upsert" (default) replaces a live record; "reject" fails the SET.
    pub duplicate_policy: DuplicatePolicy,

    pub storage: StorageConfig,

    /// Background sweep cadence. Unset or 0 keeps expiry purely lazy.
    pub sweep_interval_secs: Option<u64>,

    /// Append logs here instead of stderr.
    pub log_file: Option<PathBuf>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Default)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StorageConfig {
    #[default]
    Memory,
    Sqlite {
        path: PathBuf,
    },
}

impl ProtectConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_yaml(&raw).with_context(|| format!("failed to parse config {}", path.display()))
    }

    pub fn from_yaml(raw: &str) -> anyhow::Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw).context("invalid protect config")
    }

    pub fn sweep_interval(&self) -> Option<Duration> {
        self.sweep_interval_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    pub fn open_store(&self) -> Result<Box<dyn RecordStore>, RegistryError> {
        Ok(match &self.storage {
            StorageConfig::Memory => Box::new(MemoryStore::new()),
            StorageConfig::Sqlite { path } => Box::new(SqliteStore::open(path)?),
        })
    }

    pub fn open_registry(&self) -> Result<ProtectionRegistry, RegistryError> {
        self.open_registry_with_clock(Arc::new(SystemClock))
    }

    pub fn open_registry_with_clock(
        &self,
        clock: Arc<dyn Clock>,
    ) -> Result<ProtectionRegistry, RegistryError> {
        Ok(ProtectionRegistry::new(
            self.open_store()?,
            self.duplicate_policy,
            clock,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = ProtectConfig::from_yaml("").unwrap();
        assert_eq!(cfg.duplicate_policy, DuplicatePolicy::Upsert);
        assert_eq!(cfg.storage, StorageConfig::Memory);
        assert_eq!(cfg.sweep_interval(), None);
        assert_eq!(cfg.log_file, None);
    }

    #[test]
    fn test_full_yaml() {
        let cfg = ProtectConfig::from_yaml(
            r#"
duplicate_policy: reject
storage:
  backend: sqlite
  path: /var/lib/protect/protect.db
sweep_interval_secs: 30
log_file: log/protect.log
"#,
        )
        .unwrap();
        assert_eq!(cfg.duplicate_policy, DuplicatePolicy::Reject);
        assert_eq!(
            cfg.storage,
            StorageConfig::Sqlite {
                path: PathBuf::from("/var/lib/protect/protect.db")
            }
        );
        assert_eq!(cfg.sweep_interval(), Some(Duration::from_secs(30)));
        assert_eq!(cfg.log_file, Some(PathBuf::from("log/protect.log")));
    }

    #[test]
    fn test_zero_interval_disables_sweeper() {
        let cfg = ProtectConfig::from_yaml("sweep_interval_secs: 0").unwrap();
        assert_eq!(cfg.sweep_interval(), None);
    }

    #[test]
    fn test_unknown_policy_is_error() {
        assert!(ProtectConfig::from_yaml("duplicate_policy: merge").is_err());
    }

    #[test]
    fn test_load_reports_missing_file() {
        let err = ProtectConfig::load(Path::new("/nonexistent/protect.yaml")).unwrap_err();
        assert!(err.to_string().contains("failed to read config"));
    }

    #[test]
    fn test_open_registry_sqlite() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = ProtectConfig {
            storage: StorageConfig::Sqlite {
                path: dir.path().join("p.db"),
            },
            ..Default::default()
        };
        let reg = cfg.open_registry().unwrap();
        assert!(reg.pull().unwrap().is_empty());
        reg.close().unwrap();
    }
}
