//! SqliteStore: durable protection records with a rehydrated in-memory view.
//!
//! The table is the source of truth; other processes may write it too.
//! `begin` takes the write lock (`BEGIN IMMEDIATE`) and reloads the view
//! when `PRAGMA data_version` shows another connection committed since the
//! last read, so a sweep-check-write sequence sees every committed row.
//! Writes outside `begin`/`commit` run in their own transaction and touch
//! the view only after it committed.

use super::schema::PROTECTION_SCHEMA;
use super::RecordStore;
use crate::errors::RegistryError;
use crate::model::{DefenseLevel, ProtectionId, ProtectionRecord};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-backed record store.
pub struct SqliteStore {
    conn: Connection,
    view: BTreeMap<ProtectionId, ProtectionRecord>,
    /// `PRAGMA data_version` when the view was loaded; `None` forces a reload.
    data_version: Option<i64>,
    txn_open: bool,
}

impl SqliteStore {
    /// Open a file-backed store, creating the table if needed.
    pub fn open(path: &Path) -> Result<Self, RegistryError> {
        let conn = Connection::open(path)?;
        let store = Self::from_connection(conn)?;
        info!(
            path = %path.display(),
            records = store.view.len(),
            "opened protection store"
        );
        Ok(store)
    }

    /// Create an in-memory store (for testing).
    pub fn memory() -> Result<Self, RegistryError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    /// Create store from an existing connection and load every row.
    pub fn from_connection(conn: Connection) -> Result<Self, RegistryError> {
        Self::init_connection(&conn)?;
        let mut store = Self {
            conn,
            view: BTreeMap::new(),
            data_version: None,
            txn_open: false,
        };
        store.sync_view()?;
        Ok(store)
    }

    fn init_connection(conn: &Connection) -> Result<(), RegistryError> {
        // WAL mode for file-backed DBs (no-op for in-memory)
        let _ = conn.execute("PRAGMA journal_mode = WAL", []);
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(PROTECTION_SCHEMA)?;
        Ok(())
    }

    /// Reload the view if another connection committed since it was read.
    fn sync_view(&mut self) -> Result<(), RegistryError> {
        let version: i64 = self
            .conn
            .query_row("PRAGMA data_version", [], |row| row.get(0))?;
        if self.data_version != Some(version) {
            self.view = load_all(&self.conn)?;
            self.data_version = Some(version);
            debug!(records = self.view.len(), "loaded protection view");
        }
        Ok(())
    }

    /// Run `f` in the open transaction, or in a transaction of its own.
    fn write<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, RegistryError>,
    ) -> Result<T, RegistryError> {
        if self.txn_open {
            f(&self.conn)
        } else {
            self.in_txn(f)
        }
    }

    fn in_txn<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, RegistryError>,
    ) -> Result<T, RegistryError> {
        // BEGIN IMMEDIATE acquires write lock immediately
        self.conn.execute("BEGIN IMMEDIATE", [])?;

        let result = f(&self.conn);

        match &result {
            Ok(_) => {
                if let Err(e) = self.conn.execute("COMMIT", []) {
                    warn!(error = %e, "commit failed, rolling back");
                    let _ = self.conn.execute("ROLLBACK", []);
                    return Err(e.into());
                }
            }
            Err(e) => {
                warn!(error = %e, "rolling back protection store write");
                let _ = self.conn.execute("ROLLBACK", []);
            }
        }

        result
    }

    /// The view may hold writes that never committed; rebuild it from the table.
    fn discard_view(&mut self) {
        self.data_version = None;
        if let Err(e) = self.sync_view() {
            warn!(error = %e, "failed to reload protection view");
        }
    }
}

impl RecordStore for SqliteStore {
    fn begin(&mut self) -> Result<(), RegistryError> {
        self.conn.execute("BEGIN IMMEDIATE", [])?;
        if let Err(e) = self.sync_view() {
            let _ = self.conn.execute("ROLLBACK", []);
            return Err(e);
        }
        self.txn_open = true;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), RegistryError> {
        self.txn_open = false;
        if let Err(e) = self.conn.execute("COMMIT", []) {
            warn!(error = %e, "commit failed, rolling back");
            let _ = self.conn.execute("ROLLBACK", []);
            self.discard_view();
            return Err(e.into());
        }
        Ok(())
    }

    fn rollback(&mut self) {
        self.txn_open = false;
        if let Err(e) = self.conn.execute("ROLLBACK", []) {
            warn!(error = %e, "rollback failed");
        }
        self.discard_view();
    }

    fn get(&self, id: ProtectionId) -> Option<ProtectionRecord> {
        self.view.get(&id).copied()
    }

    fn records(&self) -> Vec<ProtectionRecord> {
        self.view.values().copied().collect()
    }

    fn put(&mut self, record: ProtectionRecord) -> Result<(), RegistryError> {
        self.write(|conn| {
            conn.execute(
                r#"
                INSERT INTO protections (id, defense, start_protect, end_protect)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(id) DO UPDATE SET
                    defense = excluded.defense,
                    start_protect = excluded.start_protect,
                    end_protect = excluded.end_protect
                "#,
                params![
                    record.id.0,
                    record.defense.get(),
                    format_ts(record.start),
                    format_ts(record.end),
                ],
            )?;
            Ok(())
        })?;
        self.view.insert(record.id, record);
        Ok(())
    }

    fn remove_expired(&mut self, now: DateTime<Utc>) -> Result<usize, RegistryError> {
        let expired: Vec<ProtectionId> = self
            .view
            .values()
            .filter(|rec| rec.is_expired_at(now))
            .map(|rec| rec.id)
            .collect();
        if expired.is_empty() {
            return Ok(0);
        }

        self.write(|conn| {
            let mut stmt = conn.prepare_cached("DELETE FROM protections WHERE id = ?1")?;
            for id in &expired {
                stmt.execute([id.0])?;
            }
            Ok(())
        })?;

        for id in &expired {
            self.view.remove(id);
        }
        debug!(removed = expired.len(), "deleted expired protection rows");
        Ok(expired.len())
    }

    fn len(&self) -> usize {
        self.view.len()
    }

    fn backend(&self) -> &'static str {
        "sqlite"
    }

    fn close(self: Box<Self>) -> Result<(), RegistryError> {
        self.conn
            .close()
            .map_err(|(_, e)| RegistryError::StoreUnavailable(e.to_string()))
    }
}

fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_ts(column: &str, raw: &str) -> Result<DateTime<Utc>, RegistryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RegistryError::StoreUnavailable(format!("Invalid {column} timestamp: {e}")))
}

fn load_all(conn: &Connection) -> Result<BTreeMap<ProtectionId, ProtectionRecord>, RegistryError> {
    let mut stmt =
        conn.prepare("SELECT id, defense, start_protect, end_protect FROM protections ORDER BY id")?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, i64>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
        ))
    })?;

    let mut view = BTreeMap::new();
    for row in rows {
        let (id, defense, start, end) = row?;
        let defense = DefenseLevel::new(defense).map_err(|_| {
            RegistryError::StoreUnavailable(format!("Invalid defense {defense} for id {id}"))
        })?;
        let record = ProtectionRecord {
            id: ProtectionId(id),
            defense,
            start: parse_ts("start_protect", &start)?,
            end: parse_ts("end_protect", &end)?,
        };
        view.insert(record.id, record);
    }
    Ok(view)
}
