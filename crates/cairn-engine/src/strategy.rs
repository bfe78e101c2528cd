//! Forwarding strategies.
//!
//! The three strategies share the wire format, the store, and the session
//! protocol; they differ only in what they accept, what they put on the wire
//! at transmit time, and whether they acknowledge. An engine holds exactly
//! one strategy, fixed at construction.

use cairn_core::wire::{ControlByte, DestinationControl, Protocol, WireError};

/// The active forwarding strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Carry own notifications only; hand over on direct contact with the
    /// destination.
    Direct,
    /// Store-and-forward flood: accept and re-offer everything.
    Epidemic,
    /// Binary spray-and-wait: flood while the copy budget lasts, then wait
    /// for direct contact.
    SprayAndWait {
        /// Initial copy budget for newly created notifications, 1..=15.
        copies: u8,
    },
}

impl Strategy {
    /// The protocol value this strategy stamps on (and requires of) frames.
    pub fn protocol(&self) -> Protocol {
        match self {
            Strategy::Direct => Protocol::Direct,
            Strategy::Epidemic => Protocol::Epidemic,
            Strategy::SprayAndWait { .. } => Protocol::SprayAndWait,
        }
    }

    /// Control byte for a freshly created notification.
    pub fn initial_control(&self) -> Result<ControlByte, WireError> {
        match self {
            Strategy::Direct => {
                ControlByte::new(Protocol::Direct, DestinationControl::DirectOnly, 0)
            }
            Strategy::Epidemic => {
                ControlByte::new(Protocol::Epidemic, DestinationControl::Flood, 0)
            }
            Strategy::SprayAndWait { copies } => ControlByte::new(
                Protocol::SprayAndWait,
                DestinationControl::Flood,
                *copies,
            ),
        }
    }

    /// Whether a received notification is taken in at all.
    ///
    /// The caller has already checked protocol match and duplicate status;
    /// this is purely the per-strategy rule.
    pub fn accept(&self, control: ControlByte, destined_to_us: bool) -> bool {
        match self {
            Strategy::Direct => {
                control.destination_control() == DestinationControl::DirectOnly && destined_to_us
            }
            Strategy::Epidemic => control.destination_control() == DestinationControl::Flood,
            Strategy::SprayAndWait { .. } => {
                control.destination_control() == DestinationControl::Flood || destined_to_us
            }
        }
    }

    /// Whether accepting a notification triggers an acknowledgement back to
    /// the sender. Only spray-and-wait shrinks budgets, so only it acks.
    pub fn acknowledges(&self) -> bool {
        matches!(self, Strategy::SprayAndWait { .. })
    }

    /// The control byte that goes on the wire for a stored record.
    ///
    /// Direct and Epidemic emit the record unchanged. Spray-and-wait offers
    /// half the remaining budget; when the budget can no longer be halved,
    /// the frame goes out direct-only with the budget intact — the stored
    /// record is untouched either way, and only shrinks when an
    /// acknowledgement arrives.
    pub fn transmit_control(&self, stored: ControlByte) -> ControlByte {
        match self {
            Strategy::Direct | Strategy::Epidemic => stored,
            Strategy::SprayAndWait { .. } => {
                let halved = stored.sequence_number() / 2;
                stored
                    .with_sequence_number(halved)
                    .or_else(|_| stored.with_destination_control(DestinationControl::DirectOnly))
                    .unwrap_or(stored)
            }
        }
    }
}
