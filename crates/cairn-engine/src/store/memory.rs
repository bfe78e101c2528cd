//! In-memory implementation of the notification store.
//!
//! No durability — state is gone when the engine drops. Used by the test
//! suites and by embedders that want an ephemeral node.

use std::collections::{BTreeMap, HashSet};

use cairn_core::address::Address;
use cairn_core::notification::Notification;
use cairn_core::wire::DestinationControl;

use super::{NotificationStore, Result, StoreError};

/// Memory-backed store. Iteration order is by hashed identifier, which is
/// stable for a given set of records.
#[derive(Default)]
pub struct MemoryStore {
    notifications: BTreeMap<[u8; 32], Notification>,
    addresses: Vec<Address>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn get_mut(&mut self, hashed_id: &[u8; 32]) -> Result<&mut Notification> {
        self.notifications
            .get_mut(hashed_id)
            .ok_or_else(|| StoreError::UnknownNotification(hex::encode(&hashed_id[..8])))
    }
}

impl NotificationStore for MemoryStore {
    fn insert(&mut self, notification: &Notification) -> Result<()> {
        self.notifications
            .insert(notification.hashed_id, notification.clone());
        Ok(())
    }

    fn fetch_by_hashed_id(&self, hashed_id: &[u8; 32]) -> Result<Option<Notification>> {
        Ok(self.notifications.get(hashed_id).cloned())
    }

    fn fetch_all_hashed_ids(&self) -> Result<HashSet<[u8; 32]>> {
        Ok(self.notifications.keys().copied().collect())
    }

    fn fetch_all_transmittable(&self) -> Result<Vec<Notification>> {
        Ok(self
            .notifications
            .values()
            .filter(|n| n.is_transmittable())
            .cloned()
            .collect())
    }

    fn fetch_all_for(&self, hashed_address: &[u8; 32]) -> Result<Vec<Notification>> {
        Ok(self
            .notifications
            .values()
            .filter(|n| &n.hashed_destination == hashed_address)
            .cloned()
            .collect())
    }

    fn set_destination_control(
        &mut self,
        hashed_id: &[u8; 32],
        destination_control: DestinationControl,
    ) -> Result<()> {
        let record = self.get_mut(hashed_id)?;
        record.control = record.control.with_destination_control(destination_control)?;
        Ok(())
    }

    fn set_sequence_number(&mut self, hashed_id: &[u8; 32], sequence_number: u8) -> Result<()> {
        let record = self.get_mut(hashed_id)?;
        record.control = record.control.with_sequence_number(sequence_number)?;
        Ok(())
    }

    fn insert_address(&mut self, address: &Address) -> Result<()> {
        match self.addresses.iter_mut().find(|a| a.value == address.value) {
            Some(existing) => *existing = address.clone(),
            None => self.addresses.push(address.clone()),
        }
        Ok(())
    }

    fn fetch_own_address(&self) -> Result<Option<Address>> {
        Ok(self.addresses.iter().find(|a| a.is_own).cloned())
    }
}
