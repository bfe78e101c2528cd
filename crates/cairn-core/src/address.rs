//! Peer addresses.
//!
//! An address is a 32-byte opaque value generated once, uniformly at random.
//! Only its BLAKE3 hash ever appears on the wire, so observing traffic does
//! not reveal the address itself. Exactly one persisted address per device
//! carries the own-flag.

use rand::RngCore;

use crate::crypto;

/// Number of characters in an advertisement tag.
pub const TAG_LENGTH: usize = 8;

/// A peer address: the opaque value plus its cached hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    /// 32 random bytes, fixed at first creation.
    pub value: [u8; 32],

    /// Cached BLAKE3 hash of `value` — the only form placed on the wire.
    pub hashed: [u8; 32],

    /// Whether this is the device's own address. One per store.
    pub is_own: bool,

    /// Display name, resolved from the external address book. Not persisted.
    pub name: Option<String>,
}

impl Address {
    /// Generate a fresh random address.
    pub fn generate() -> Self {
        let mut value = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut value);
        Self::from_value(value)
    }

    /// Reconstruct an address from its stored value.
    /// The hash is derived deterministically.
    pub fn from_value(value: [u8; 32]) -> Self {
        Self {
            value,
            hashed: crypto::hash(&value),
            is_own: false,
            name: None,
        }
    }

    /// A fresh presence tag: base58 of a brand-new random address hash,
    /// truncated to [`TAG_LENGTH`] characters. A new tag per advertisement
    /// keeps broadcasts unlinkable to the device's real address.
    pub fn fresh_tag() -> String {
        let throwaway = Self::generate();
        bs58::encode(throwaway.hashed)
            .into_string()
            .chars()
            .take(TAG_LENGTH)
            .collect()
    }
}
