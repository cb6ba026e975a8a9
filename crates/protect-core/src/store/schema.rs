//! SQLite schema for durable protection records.

/// DDL for the protection table.
///
/// Timestamps are RFC3339 UTC strings with nanosecond precision so a
/// rehydrated record compares equal to the one that was written.
pub const PROTECTION_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS protections (
    id            INTEGER PRIMARY KEY,
    defense       INTEGER NOT NULL CHECK (defense BETWEEN 1 AND 3),
    start_protect TEXT NOT NULL,
    end_protect   TEXT NOT NULL
);
"#;
