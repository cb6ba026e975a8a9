use chrono::{TimeDelta, TimeZone, Utc};
use protect_core::store::SqliteStore;
use protect_core::{
    DefenseLevel, DuplicatePolicy, ManualClock, ProtectConfig, ProtectionId, ProtectionRegistry,
    RegistryError, StorageConfig, Ttl,
};
use std::path::Path;
use std::sync::Arc;

fn open(path: &Path, clock: Arc<ManualClock>, policy: DuplicatePolicy) -> ProtectionRegistry {
    let cfg = ProtectConfig {
        duplicate_policy: policy,
        storage: StorageConfig::Sqlite {
            path: path.to_path_buf(),
        },
        ..Default::default()
    };
    cfg.open_registry_with_clock(clock).unwrap()
}

fn protect(reg: &ProtectionRegistry, id: i64, defense: i64, ttl: i64) {
    reg.set(
        ProtectionId(id),
        DefenseLevel::new(defense).unwrap(),
        Ttl::from_secs(ttl).unwrap(),
    )
    .unwrap();
}

#[test]
fn test_restart_rehydrates_live_records() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("protect.db");
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
    ));

    let reg = open(&path, clock.clone(), DuplicatePolicy::Upsert);
    protect(&reg, 2, 2, 100);
    protect(&reg, 1, 3, 10);
    let before = reg.pull().unwrap();
    reg.close().unwrap();

    let reg = open(&path, clock.clone(), DuplicatePolicy::Upsert);
    assert_eq!(reg.pull().unwrap(), before);
}

#[test]
fn test_records_expired_while_down_are_purged_on_first_access() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("protect.db");
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
    ));

    let reg = open(&path, clock.clone(), DuplicatePolicy::Upsert);
    protect(&reg, 1, 1, 5);
    protect(&reg, 2, 1, 500);
    reg.close().unwrap();

    clock.advance(TimeDelta::seconds(60));
    let reg = open(&path, clock.clone(), DuplicatePolicy::Upsert);
    // dead row is still physically present until touched
    assert_eq!(reg.held().unwrap(), 2);

    let live = reg.pull().unwrap();
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].id, ProtectionId(2));
    reg.close().unwrap();

    let store = SqliteStore::open(&path).unwrap();
    assert_eq!(protect_core::store::RecordStore::len(&store), 1);
}

#[test]
fn test_reject_policy_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("protect.db");
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
    ));

    let reg = open(&path, clock.clone(), DuplicatePolicy::Reject);
    protect(&reg, 5, 2, 100);
    reg.close().unwrap();

    let reg = open(&path, clock.clone(), DuplicatePolicy::Reject);
    let result = reg.set(
        ProtectionId(5),
        DefenseLevel::new(3).unwrap(),
        Ttl::from_secs(50).unwrap(),
    );
    assert!(result.is_err());
    assert_eq!(reg.pull().unwrap()[0].defense.get(), 2);
}

#[test]
fn test_reject_policy_holds_across_registries_sharing_a_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("protect.db");
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
    ));

    let a = open(&path, clock.clone(), DuplicatePolicy::Reject);
    let b = open(&path, clock.clone(), DuplicatePolicy::Reject);

    protect(&a, 5, 2, 100);
    let second = b.set(
        ProtectionId(5),
        DefenseLevel::new(3).unwrap(),
        Ttl::from_secs(50).unwrap(),
    );
    assert!(matches!(
        second,
        Err(RegistryError::DuplicateId { id }) if id == ProtectionId(5)
    ));

    let seen_by_a = a.pull().unwrap();
    assert_eq!(seen_by_a.len(), 1);
    assert_eq!(seen_by_a[0].defense.get(), 2);
    assert_eq!(b.pull().unwrap(), seen_by_a);
}

#[test]
fn test_registries_sharing_a_file_see_each_others_writes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("protect.db");
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
    ));

    let a = open(&path, clock.clone(), DuplicatePolicy::Upsert);
    let b = open(&path, clock.clone(), DuplicatePolicy::Upsert);

    protect(&a, 1, 1, 10);
    protect(&b, 2, 2, 100);
    protect(&b, 1, 3, 100);

    let ids_and_defense = |reg: &ProtectionRegistry| -> Vec<(i64, u8)> {
        reg.pull()
            .unwrap()
            .iter()
            .map(|r| (r.id.0, r.defense.get()))
            .collect()
    };
    assert_eq!(ids_and_defense(&a), vec![(1, 3), (2, 2)]);

    // a sweep in one registry is visible to the other
    clock.advance(TimeDelta::seconds(100));
    assert_eq!(b.sweep().unwrap(), 2);
    assert_eq!(a.held().unwrap(), 0);
}
