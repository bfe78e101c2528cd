//! cairn wire format — on-wire types for notification dissemination.
//!
//! These types ARE the protocol. Every field, every offset, every bit of the
//! control byte is part of the wire format and must match on all peers.
//! Changing anything here is a breaking change.
//!
//! The fixed 105-byte frame prefix is #[repr(C, packed)] for deterministic
//! layout and uses zerocopy derives for safe, allocation-free serialization.
//! There is no unsafe code in this module.

use static_assertions::assert_eq_size;
use zerocopy::{AsBytes, FromBytes, FromZeroes};

// ── Control byte fields ───────────────────────────────────────────────────────

/// Forwarding strategy discriminator, bits [7..6] of the control byte.
///
/// A peer only processes frames carrying its own protocol value; everything
/// else is silently dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Protocol {
    /// Deliver only on direct contact with the destination.
    Direct = 0,
    /// Flood to every encountered peer.
    Epidemic = 1,
    /// Binary spray-and-wait with a bounded copy budget.
    SprayAndWait = 2,
}

impl TryFrom<u8> for Protocol {
    type Error = WireError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Protocol::Direct),
            1 => Ok(Protocol::Epidemic),
            2 => Ok(Protocol::SprayAndWait),
            other => Err(WireError::InvalidControlByteValue {
                field: "protocol",
                value: other,
            }),
        }
    }
}

/// Destination control, bits [5..4] of the control byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DestinationControl {
    /// Terminal: delivered to us, or the end-of-session sentinel on the wire.
    /// Terminal records are kept for duplicate suppression but never
    /// retransmitted.
    Terminal = 0,
    /// Forward to every peer the strategy allows.
    Flood = 1,
    /// Hand over only to the destination itself.
    DirectOnly = 2,
}

impl TryFrom<u8> for DestinationControl {
    type Error = WireError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(DestinationControl::Terminal),
            1 => Ok(DestinationControl::Flood),
            2 => Ok(DestinationControl::DirectOnly),
            other => Err(WireError::InvalidControlByteValue {
                field: "destination_control",
                value: other,
            }),
        }
    }
}

/// Largest representable sequence number (4 bits).
pub const MAX_SEQUENCE_NUMBER: u8 = 15;

// ── ControlByte ───────────────────────────────────────────────────────────────

/// The one-octet frame header: protocol, destination control, and the
/// spray-and-wait copy budget, packed 2/2/4.
///
/// Bit layout:
///   bits [7..6]  protocol            (0 direct, 1 epidemic, 2 spray-and-wait)
///   bits [5..4]  destination control (0 terminal, 1 flood, 2 direct-only)
///   bits [3..0]  sequence number     (0..15, copy budget; 0 outside spray-and-wait)
///
/// Construction validates the combination, not just the field ranges: a
/// non-zero sequence number only exists under spray-and-wait, and a live
/// spray-and-wait record (flood or direct-only) always holds at least one
/// copy. `set_sequence_number` failing on a would-be-zero budget is what
/// drives the promotion to direct-only in the acknowledgement path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlByte {
    protocol: Protocol,
    destination_control: DestinationControl,
    sequence_number: u8,
}

impl ControlByte {
    pub fn new(
        protocol: Protocol,
        destination_control: DestinationControl,
        sequence_number: u8,
    ) -> Result<Self, WireError> {
        if sequence_number > MAX_SEQUENCE_NUMBER {
            return Err(WireError::InvalidControlByteValue {
                field: "sequence_number",
                value: sequence_number,
            });
        }
        let valid = match protocol {
            Protocol::Direct | Protocol::Epidemic => sequence_number == 0,
            Protocol::SprayAndWait => {
                destination_control == DestinationControl::Terminal || sequence_number >= 1
            }
        };
        if !valid {
            return Err(WireError::InvalidControlByteValue {
                field: "sequence_number",
                value: sequence_number,
            });
        }
        Ok(Self {
            protocol,
            destination_control,
            sequence_number,
        })
    }

    /// Pack into the wire octet.
    pub fn pack(self) -> u8 {
        ((self.protocol as u8) << 6)
            | ((self.destination_control as u8) << 4)
            | self.sequence_number
    }

    /// Unpack a wire octet. Validates field ranges and the field combination.
    pub fn unpack(byte: u8) -> Result<Self, WireError> {
        let protocol = Protocol::try_from(byte >> 6)?;
        let destination_control = DestinationControl::try_from((byte >> 4) & 0b11)?;
        let sequence_number = byte & 0x0f;
        Self::new(protocol, destination_control, sequence_number)
    }

    pub fn protocol(self) -> Protocol {
        self.protocol
    }

    pub fn destination_control(self) -> DestinationControl {
        self.destination_control
    }

    pub fn sequence_number(self) -> u8 {
        self.sequence_number
    }

    /// Copy with a different destination control, re-validated.
    pub fn with_destination_control(
        self,
        destination_control: DestinationControl,
    ) -> Result<Self, WireError> {
        Self::new(self.protocol, destination_control, self.sequence_number)
    }

    /// Copy with a different sequence number, re-validated.
    pub fn with_sequence_number(self, sequence_number: u8) -> Result<Self, WireError> {
        Self::new(self.protocol, self.destination_control, sequence_number)
    }
}

// ── Frame layout ──────────────────────────────────────────────────────────────

/// The fixed prefix of every notification frame.
///
/// The message body follows immediately after and runs to the end of the
/// frame. The receiver can route, deduplicate, and address-match a frame
/// from this prefix alone.
///
/// Wire size: 105 bytes.
#[derive(Debug, Clone, AsBytes, FromBytes, FromZeroes)]
#[repr(C, packed)]
pub struct FrameHeader {
    /// Packed control byte. See [`ControlByte`].
    pub control: u8,

    /// BLAKE3 digest uniquely identifying the notification across the mesh.
    pub hashed_id: [u8; 32],

    /// BLAKE3 hash of the destination address. The raw address never
    /// appears on the wire.
    pub hashed_destination: [u8; 32],

    /// BLAKE3 hash of the originating address.
    pub hashed_source: [u8; 32],

    /// Creation timestamp, u64 Unix milliseconds, little-endian.
    pub sent_timestamp: [u8; 8],
}

// Compile-time size guard. If this fails, the wire format has silently changed.
assert_eq_size!(FrameHeader, [u8; 105]);

/// Length of a frame with an empty message body — the smallest valid frame.
pub const MIN_NOTIFICATION_LENGTH: usize = 105;

/// The end-of-session sentinel: a minimum-length frame whose control byte
/// carries a terminal destination control. All other bytes are zero and
/// ignored by the receiver.
pub const SENTINEL_FRAME: [u8; MIN_NOTIFICATION_LENGTH] = [0u8; MIN_NOTIFICATION_LENGTH];

/// Longest message body a transport with the given frame MTU can carry.
pub const fn max_message_length(max_notification_length: usize) -> usize {
    max_notification_length - MIN_NOTIFICATION_LENGTH
}

// ── Errors ────────────────────────────────────────────────────────────────────

/// Errors that can arise when interpreting wire-format data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    #[error("control byte field {field} out of range: {value}")]
    InvalidControlByteValue { field: &'static str, value: u8 },

    #[error("frame too short: {0} bytes (minimum {})", MIN_NOTIFICATION_LENGTH)]
    FrameTooShort(usize),
}

// ── Tests ─────────────────────────────────────────────────────────────────────
