//! The notification record — the unit of dissemination.
//!
//! A notification is created once on the originating peer and then replicated
//! verbatim across the mesh; only the control byte changes after creation.
//! Its identifier is a BLAKE3 digest over the hashed source address, the
//! creation timestamp, and the message body, so the same identifier names the
//! same notification on every peer.

use zerocopy::{AsBytes, FromBytes};

use crate::crypto::Hasher;
use crate::wire::{ControlByte, DestinationControl, FrameHeader, WireError, MIN_NOTIFICATION_LENGTH};

/// One notification, in memory and in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Current control byte. Only the destination control and the sequence
    /// number ever change after creation.
    pub control: ControlByte,

    /// BLAKE3 digest identifying this notification mesh-wide. Primary key.
    pub hashed_id: [u8; 32],

    /// Hashed destination address.
    pub hashed_destination: [u8; 32],

    /// Hashed originating address.
    pub hashed_source: [u8; 32],

    /// Creation timestamp, Unix milliseconds.
    pub sent_timestamp: u64,

    /// UTF-8 message body.
    pub message: String,
}

impl Notification {
    /// Create a new notification on the originating peer.
    ///
    /// Stamps the current time and derives the identifier from it.
    pub fn create(
        control: ControlByte,
        hashed_destination: [u8; 32],
        hashed_source: [u8; 32],
        message: String,
    ) -> Self {
        let sent_timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_millis() as u64;

        let hashed_id = Self::compute_hashed_id(&hashed_source, sent_timestamp, &message);

        Self {
            control,
            hashed_id,
            hashed_destination,
            hashed_source,
            sent_timestamp,
            message,
        }
    }

    /// The mesh-wide identifier: BLAKE3 over source hash, timestamp, body.
    pub fn compute_hashed_id(
        hashed_source: &[u8; 32],
        sent_timestamp: u64,
        message: &str,
    ) -> [u8; 32] {
        let mut hasher = Hasher::new();
        hasher.update(hashed_source);
        hasher.update(&sent_timestamp.to_le_bytes());
        hasher.update(message.as_bytes());
        hasher.finalize()
    }

    /// Parse a wire frame.
    ///
    /// Frames shorter than the fixed prefix are rejected. A message tail
    /// that is not valid UTF-8 is replaced by the empty string; the frame
    /// itself is still accepted.
    pub fn from_frame(frame: &[u8]) -> Result<Self, WireError> {
        if frame.len() < MIN_NOTIFICATION_LENGTH {
            return Err(WireError::FrameTooShort(frame.len()));
        }
        let header = FrameHeader::read_from_prefix(frame)
            .ok_or(WireError::FrameTooShort(frame.len()))?;
        let control = ControlByte::unpack(header.control)?;
        let message = String::from_utf8(frame[MIN_NOTIFICATION_LENGTH..].to_vec())
            .unwrap_or_default();

        Ok(Self {
            control,
            hashed_id: header.hashed_id,
            hashed_destination: header.hashed_destination,
            hashed_source: header.hashed_source,
            sent_timestamp: u64::from_le_bytes(header.sent_timestamp),
            message,
        })
    }

    /// Serialize to a wire frame: the 105-byte prefix followed by the body.
    pub fn to_frame(&self) -> Vec<u8> {
        let header = FrameHeader {
            control: self.control.pack(),
            hashed_id: self.hashed_id,
            hashed_destination: self.hashed_destination,
            hashed_source: self.hashed_source,
            sent_timestamp: self.sent_timestamp.to_le_bytes(),
        };
        let mut frame = Vec::with_capacity(MIN_NOTIFICATION_LENGTH + self.message.len());
        frame.extend_from_slice(header.as_bytes());
        frame.extend_from_slice(self.message.as_bytes());
        frame
    }

    /// Whether this record may still appear in a transmit queue.
    pub fn is_transmittable(&self) -> bool {
        self.control.destination_control() != DestinationControl::Terminal
    }
}
