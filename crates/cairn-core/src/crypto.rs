//! Hashing primitives for cairn.
//!
//! BLAKE3 is the fixed hash `H` shared by all peers: it derives the hashed
//! address placed on the wire and the notification identifier. Link-layer
//! security (if any) belongs to the transport and is not handled here.

/// Hash a byte slice, returning a 32-byte BLAKE3 digest.
///
/// Used for address hashes and notification identifiers.
pub fn hash(data: &[u8]) -> [u8; 32] {
    *blake3::hash(data).as_bytes()
}

/// Incremental BLAKE3 hasher for digests built from several pieces.
///
/// # Example
/// ```
/// use cairn_core::crypto::Hasher;
/// let mut h = Hasher::new();
/// h.update(b"hello ");
/// h.update(b"world");
/// let digest = h.finalize();
/// assert_eq!(digest, cairn_core::crypto::hash(b"hello world"));
/// ```
pub struct Hasher(blake3::Hasher);

impl Hasher {
    pub fn new() -> Self {
        Self(blake3::Hasher::new())
    }

    pub fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    pub fn finalize(self) -> [u8; 32] {
        *self.0.finalize().as_bytes()
    }
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}
