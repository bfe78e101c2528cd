//! Address book — the set of known peers.
//!
//! Provisioned externally (config file, UI) and shared with any display
//! layer; the engine only reads it to resolve names and enumerate contacts.
//! Keyed by hashed address, since that is the only form that appears on the
//! wire.

use dashmap::DashMap;
use std::sync::Arc;

use cairn_core::address::Address;
use cairn_core::config::ContactConfig;

/// Registry of known addresses, shared between the engine and the embedder.
pub struct AddressBook {
    entries: Arc<DashMap<[u8; 32], Address>>,
}

impl Default for AddressBook {
    fn default() -> Self {
        Self::new()
    }
}

impl AddressBook {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
        }
    }

    /// Seed the book from config entries: hex address values plus names.
    /// Malformed entries are skipped with a warning.
    pub fn apply_config(&self, contacts: &[ContactConfig]) {
        for contact in contacts {
            match hex::decode(&contact.address) {
                Ok(bytes) if bytes.len() == 32 => {
                    let mut value = [0u8; 32];
                    value.copy_from_slice(&bytes);
                    let mut address = Address::from_value(value);
                    address.name = Some(contact.name.clone());
                    tracing::info!(
                        peer = hex::encode(&address.hashed[..8]),
                        name = %contact.name,
                        "provisioned contact from config"
                    );
                    self.insert(address);
                }
                _ => {
                    tracing::warn!(
                        name = %contact.name,
                        "skipping contact with malformed address"
                    );
                }
            }
        }
    }

    pub fn insert(&self, address: Address) {
        self.entries.insert(address.hashed, address);
    }

    pub fn get(&self, hashed: &[u8; 32]) -> Option<Address> {
        self.entries.get(hashed).map(|entry| entry.value().clone())
    }

    /// Display name for a hashed address, if the peer is known.
    pub fn resolve_name(&self, hashed: &[u8; 32]) -> Option<String> {
        self.entries
            .get(hashed)
            .and_then(|entry| entry.value().name.clone())
    }

    /// Every known address except our own.
    pub fn contacts(&self, own_hashed: &[u8; 32]) -> Vec<Address> {
        self.entries
            .iter()
            .filter(|entry| entry.key() != own_hashed)
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Clone for AddressBook {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}
