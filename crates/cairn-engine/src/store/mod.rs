//! Persistent notification store.
//!
//! A durable, single-writer repository of two entity kinds: addresses (one
//! marked own) and notification records keyed by hashed identifier. The
//! engine owns the store from its single logical thread, so the interface is
//! synchronous and takes `&mut self` for writes. Every write is committed
//! before it returns — inserting IS saving.
//!
//! Implementations: [`SqliteStore`] (primary) and [`MemoryStore`] (tests and
//! ephemeral embedding).

use std::collections::HashSet;

use cairn_core::address::Address;
use cairn_core::notification::Notification;
use cairn_core::wire::{DestinationControl, WireError};

mod memory;
mod migration;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Errors from the persistence layer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A control byte mutation was rejected by the wire-format rules.
    #[error(transparent)]
    InvalidControlByte(#[from] WireError),

    /// A mutation targeted a hashed identifier the store does not hold.
    #[error("unknown notification {0}")]
    UnknownNotification(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("migration failed: {0}")]
    Migration(String),

    #[error("failed to open store at {0}: {1}")]
    Open(std::path::PathBuf, std::io::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// The store interface consumed by the engine.
pub trait NotificationStore {
    /// Upsert by hashed identifier. Durable on return.
    fn insert(&mut self, notification: &Notification) -> Result<()>;

    fn fetch_by_hashed_id(&self, hashed_id: &[u8; 32]) -> Result<Option<Notification>>;

    /// Every hashed identifier ever stored — seeds the receive set at startup.
    fn fetch_all_hashed_ids(&self) -> Result<HashSet<[u8; 32]>>;

    /// Records whose destination control is not terminal, in a stable order.
    fn fetch_all_transmittable(&self) -> Result<Vec<Notification>>;

    /// Records destined for the given hashed address — rebuilds the inbox.
    fn fetch_all_for(&self, hashed_address: &[u8; 32]) -> Result<Vec<Notification>>;

    /// Overwrite a stored record's destination control, validated against
    /// the wire-format rules.
    fn set_destination_control(
        &mut self,
        hashed_id: &[u8; 32],
        destination_control: DestinationControl,
    ) -> Result<()>;

    /// Overwrite a stored record's sequence number, validated against the
    /// wire-format rules. Fails with [`StoreError::InvalidControlByte`] when
    /// the new value is not representable for the record's protocol — the
    /// acknowledgement path relies on that failure to promote records to
    /// direct-only.
    fn set_sequence_number(&mut self, hashed_id: &[u8; 32], sequence_number: u8) -> Result<()>;

    /// Upsert an address record by its opaque value.
    fn insert_address(&mut self, address: &Address) -> Result<()>;

    /// The address marked own, if one has been persisted yet.
    fn fetch_own_address(&self) -> Result<Option<Address>>;
}
