//! SQLite implementation of the notification store.
//!
//! The primary backend: rusqlite with bundled SQLite, one connection owned
//! by the engine. Autocommit makes every insert and mutation durable before
//! the call returns, which is the store's auto-save contract.

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};

use cairn_core::address::Address;
use cairn_core::notification::Notification;
use cairn_core::wire::{ControlByte, DestinationControl, Protocol};

use super::migration::{self, now_millis};
use super::{NotificationStore, Result, StoreError};

/// SQLite-backed store.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (creating if necessary) a database at the given path and bring
    /// its schema up to date.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Open(path.to_path_buf(), e))?;
        }
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self { conn })
    }

    /// Open an in-memory database. Useful for tests.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self { conn })
    }

    fn fetch_control(&self, hashed_id: &[u8; 32]) -> Result<ControlByte> {
        let raw: Option<(u8, u8, u8)> = self
            .conn
            .query_row(
                "SELECT protocol, destination_control, sequence_number
                 FROM notifications WHERE hashed_id = ?1",
                params![hashed_id.as_slice()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;
        let (protocol, destination_control, sequence_number) = raw.ok_or_else(|| {
            StoreError::UnknownNotification(hex::encode(&hashed_id[..8]))
        })?;
        Ok(ControlByte::new(
            Protocol::try_from(protocol)?,
            DestinationControl::try_from(destination_control)?,
            sequence_number,
        )?)
    }

    fn query_notifications<P: rusqlite::Params>(
        &self,
        sql: &str,
        params: P,
    ) -> Result<Vec<Notification>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, read_raw)?;
        let mut notifications = Vec::new();
        for raw in rows {
            notifications.push(into_notification(raw?)?);
        }
        Ok(notifications)
    }
}

/// Raw column values before wire-format validation.
struct RawNotification {
    protocol: u8,
    destination_control: u8,
    sequence_number: u8,
    hashed_id: [u8; 32],
    hashed_destination: [u8; 32],
    hashed_source: [u8; 32],
    sent_timestamp: i64,
    message: String,
}

fn blob32(row: &rusqlite::Row<'_>, column: &'static str) -> rusqlite::Result<[u8; 32]> {
    let bytes: Vec<u8> = row.get(column)?;
    bytes.try_into().map_err(|_| {
        rusqlite::Error::InvalidColumnType(0, column.into(), rusqlite::types::Type::Blob)
    })
}

fn read_raw(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawNotification> {
    Ok(RawNotification {
        protocol: row.get("protocol")?,
        destination_control: row.get("destination_control")?,
        sequence_number: row.get("sequence_number")?,
        hashed_id: blob32(row, "hashed_id")?,
        hashed_destination: blob32(row, "hashed_destination")?,
        hashed_source: blob32(row, "hashed_source")?,
        sent_timestamp: row.get("sent_timestamp")?,
        message: row.get("message")?,
    })
}

fn into_notification(raw: RawNotification) -> Result<Notification> {
    let control = ControlByte::new(
        Protocol::try_from(raw.protocol)?,
        DestinationControl::try_from(raw.destination_control)?,
        raw.sequence_number,
    )?;
    Ok(Notification {
        control,
        hashed_id: raw.hashed_id,
        hashed_destination: raw.hashed_destination,
        hashed_source: raw.hashed_source,
        sent_timestamp: raw.sent_timestamp as u64,
        message: raw.message,
    })
}

const SELECT_COLUMNS: &str = "SELECT hashed_id, protocol, destination_control, sequence_number,
       hashed_destination, hashed_source, sent_timestamp, message
  FROM notifications";

impl NotificationStore for SqliteStore {
    fn insert(&mut self, notification: &Notification) -> Result<()> {
        self.conn.execute(
            "INSERT INTO notifications
                 (hashed_id, protocol, destination_control, sequence_number,
                  hashed_destination, hashed_source, sent_timestamp, message, ingested_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT(hashed_id) DO UPDATE SET
                 destination_control = excluded.destination_control,
                 sequence_number = excluded.sequence_number",
            params![
                notification.hashed_id.as_slice(),
                notification.control.protocol() as u8,
                notification.control.destination_control() as u8,
                notification.control.sequence_number(),
                notification.hashed_destination.as_slice(),
                notification.hashed_source.as_slice(),
                notification.sent_timestamp as i64,
                notification.message,
                now_millis(),
            ],
        )?;
        Ok(())
    }

    fn fetch_by_hashed_id(&self, hashed_id: &[u8; 32]) -> Result<Option<Notification>> {
        let sql = format!("{SELECT_COLUMNS} WHERE hashed_id = ?1");
        let raw = self
            .conn
            .query_row(&sql, params![hashed_id.as_slice()], read_raw)
            .optional()?;
        raw.map(into_notification).transpose()
    }

    fn fetch_all_hashed_ids(&self) -> Result<std::collections::HashSet<[u8; 32]>> {
        let mut stmt = self.conn.prepare("SELECT hashed_id FROM notifications")?;
        let rows = stmt.query_map([], |row| blob32(row, "hashed_id"))?;
        let mut ids = std::collections::HashSet::new();
        for id in rows {
            ids.insert(id?);
        }
        Ok(ids)
    }

    fn fetch_all_transmittable(&self) -> Result<Vec<Notification>> {
        let sql = format!(
            "{SELECT_COLUMNS} WHERE destination_control != 0 ORDER BY ingested_at, hashed_id"
        );
        self.query_notifications(&sql, [])
    }

    fn fetch_all_for(&self, hashed_address: &[u8; 32]) -> Result<Vec<Notification>> {
        let sql = format!(
            "{SELECT_COLUMNS} WHERE hashed_destination = ?1 ORDER BY sent_timestamp, hashed_id"
        );
        self.query_notifications(&sql, params![hashed_address.as_slice()])
    }

    fn set_destination_control(
        &mut self,
        hashed_id: &[u8; 32],
        destination_control: DestinationControl,
    ) -> Result<()> {
        let updated = self
            .fetch_control(hashed_id)?
            .with_destination_control(destination_control)?;
        self.conn.execute(
            "UPDATE notifications SET destination_control = ?2 WHERE hashed_id = ?1",
            params![hashed_id.as_slice(), updated.destination_control() as u8],
        )?;
        Ok(())
    }

    fn set_sequence_number(&mut self, hashed_id: &[u8; 32], sequence_number: u8) -> Result<()> {
        let updated = self
            .fetch_control(hashed_id)?
            .with_sequence_number(sequence_number)?;
        self.conn.execute(
            "UPDATE notifications SET sequence_number = ?2 WHERE hashed_id = ?1",
            params![hashed_id.as_slice(), updated.sequence_number()],
        )?;
        Ok(())
    }

    fn insert_address(&mut self, address: &Address) -> Result<()> {
        self.conn.execute(
            "INSERT INTO addresses (value, hashed, is_own) VALUES (?1, ?2, ?3)
             ON CONFLICT(value) DO UPDATE SET is_own = excluded.is_own",
            params![
                address.value.as_slice(),
                address.hashed.as_slice(),
                address.is_own,
            ],
        )?;
        Ok(())
    }

    fn fetch_own_address(&self) -> Result<Option<Address>> {
        let value: Option<[u8; 32]> = self
            .conn
            .query_row(
                "SELECT value FROM addresses WHERE is_own = 1 LIMIT 1",
                [],
                |row| blob32(row, "value"),
            )
            .optional()?;
        Ok(value.map(|v| {
            let mut address = Address::from_value(v);
            address.is_own = true;
            address
        }))
    }
}
