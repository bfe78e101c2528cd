//! Database schema migrations for SQLite.
//!
//! A simple versioned migration system: each migration transforms the schema
//! from version N to N+1, and applied versions are recorded in a
//! `schema_migrations` table so future revisions can migrate old stores.

use rusqlite::Connection;

use super::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the database schema. Idempotent.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, now_millis()],
            )?;
        }

        tx.commit()?;
    }

    Ok(())
}

fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: initial schema.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Addresses: one row carries is_own = 1
        CREATE TABLE addresses (
            value BLOB PRIMARY KEY,           -- 32 bytes, the opaque address
            hashed BLOB NOT NULL,             -- 32 bytes, BLAKE3 of value
            is_own INTEGER NOT NULL DEFAULT 0
        );

        -- Notification records, keyed by mesh-wide identifier.
        -- Control byte fields are stored unpacked so the transmittable and
        -- inbox predicates are indexed scans.
        CREATE TABLE notifications (
            hashed_id BLOB PRIMARY KEY,       -- 32 bytes
            protocol INTEGER NOT NULL,
            destination_control INTEGER NOT NULL,
            sequence_number INTEGER NOT NULL,
            hashed_destination BLOB NOT NULL, -- 32 bytes
            hashed_source BLOB NOT NULL,      -- 32 bytes
            sent_timestamp INTEGER NOT NULL,  -- creation time, Unix ms
            message TEXT NOT NULL,
            ingested_at INTEGER NOT NULL      -- local insertion time, Unix ms
        );

        CREATE UNIQUE INDEX idx_addresses_hashed ON addresses(hashed);
        CREATE INDEX idx_notifications_destination ON notifications(hashed_destination);
        CREATE INDEX idx_notifications_dc ON notifications(destination_control);
        "#,
    )?;

    Ok(())
}

/// Get current time in milliseconds.
pub(super) fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_millis() as i64
}
