//! The dissemination engine.
//!
//! One engine per device: it owns the store, the receive set, the transmit
//! queue, and the transport, and runs one forwarding strategy fixed at
//! construction. The transport drives it through three entry points —
//! `receive_notification`, `receive_acknowledgement`, and
//! `transmit_notifications` — all invoked from (or marshalled onto) the
//! engine's single logical thread. The engine takes no locks.
//!
//! Receive-path problems (short frames, foreign protocols, duplicates,
//! rejected notifications) are absorbed here: the opportunistic protocol
//! tolerates frame loss, so they log and drop. Only creation-path errors
//! surface to the embedder.

use std::collections::HashSet;

use cairn_core::address::Address;
use cairn_core::config::{CairnConfig, StrategyKind};
use cairn_core::notification::Notification;
use cairn_core::wire::{
    self, ControlByte, DestinationControl, WireError, MIN_NOTIFICATION_LENGTH,
};

use crate::address_book::AddressBook;
use crate::session::TransmitQueue;
use crate::store::{NotificationStore, SqliteStore, StoreError};
use crate::strategy::Strategy;
use crate::transport::Transport;

/// Errors surfaced to the embedder. Everything on the receive path is
/// handled internally.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    ControlByte(#[from] WireError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("message length {len} exceeds maximum {max}")]
    MessageTooLong { len: usize, max: usize },

    #[error("operation requires the spray-and-wait strategy")]
    RequiresSprayAndWait,
}

/// The engine. Generic over the transport so tests can drive it with a
/// scripted link.
pub struct Engine<T: Transport> {
    transport: T,
    store: Box<dyn NotificationStore>,
    strategy: Strategy,
    address: Address,
    address_book: AddressBook,
    received_hashed_ids: HashSet<[u8; 32]>,
    transmit_queue: TransmitQueue,
    inbox: Vec<Notification>,
    rssi_threshold: i8,
}

impl<T: Transport> Engine<T> {
    /// Build an engine over an existing store.
    ///
    /// Loads (or on first run generates and persists) the own address, seeds
    /// the receive set from the store, and rebuilds the inbox from records
    /// addressed to us.
    pub fn new(
        transport: T,
        mut store: Box<dyn NotificationStore>,
        strategy: Strategy,
        address_book: AddressBook,
    ) -> Result<Self, EngineError> {
        // reject an unrepresentable copy budget up front
        strategy.initial_control()?;

        let address = match store.fetch_own_address()? {
            Some(address) => address,
            None => {
                let mut address = Address::generate();
                address.is_own = true;
                store.insert_address(&address)?;
                tracing::info!(
                    address = hex::encode(&address.hashed[..8]),
                    "generated own address"
                );
                address
            }
        };

        let received_hashed_ids = store.fetch_all_hashed_ids()?;
        let inbox = store.fetch_all_for(&address.hashed)?;

        tracing::info!(
            address = hex::encode(&address.hashed[..8]),
            known = received_hashed_ids.len(),
            inbox = inbox.len(),
            "engine ready"
        );

        Ok(Self {
            transport,
            store,
            strategy,
            address,
            address_book,
            received_hashed_ids,
            transmit_queue: TransmitQueue::new(),
            inbox,
            rssi_threshold: -128,
        })
    }

    /// Build an engine from configuration: SQLite store at the configured
    /// path, strategy and copy budget from the protocol section, address
    /// book seeded with the configured contacts.
    pub fn from_config(transport: T, config: &CairnConfig) -> Result<Self, EngineError> {
        let strategy = match config.protocol.strategy {
            StrategyKind::Direct => Strategy::Direct,
            StrategyKind::Epidemic => Strategy::Epidemic,
            StrategyKind::SprayAndWait => Strategy::SprayAndWait {
                copies: config.protocol.copies,
            },
        };
        let store = SqliteStore::open(&config.storage.db_path)?;
        let address_book = AddressBook::new();
        address_book.apply_config(&config.contacts);

        let mut engine = Self::new(transport, Box::new(store), strategy, address_book)?;
        engine.rssi_threshold = config.protocol.rssi_threshold;
        Ok(engine)
    }

    // ── Receive path ──────────────────────────────────────────────────────────

    /// Process one raw frame from the transport.
    pub fn receive_notification(&mut self, frame: &[u8]) {
        if frame.len() < MIN_NOTIFICATION_LENGTH {
            tracing::warn!(len = frame.len(), "dropping short frame");
            return;
        }

        let control = match ControlByte::unpack(frame[0]) {
            Ok(control) => control,
            Err(e) => {
                tracing::warn!(error = %e, "dropping frame with invalid control byte");
                return;
            }
        };

        // a terminal control byte is the end-of-session sentinel;
        // the rest of the frame is ignored
        if control.destination_control() == DestinationControl::Terminal {
            tracing::debug!("end-of-session sentinel, disconnecting");
            self.transport.disconnect();
            return;
        }

        if control.protocol() != self.strategy.protocol() {
            tracing::debug!(
                frame_protocol = ?control.protocol(),
                "dropping frame from foreign protocol"
            );
            return;
        }

        let mut hashed_id = [0u8; 32];
        hashed_id.copy_from_slice(&frame[1..33]);
        if self.received_hashed_ids.contains(&hashed_id) {
            tracing::debug!(id = hex::encode(&hashed_id[..8]), "dropping duplicate");
            return;
        }

        let mut notification = match Notification::from_frame(frame) {
            Ok(notification) => notification,
            Err(e) => {
                tracing::warn!(error = %e, "dropping unparseable frame");
                return;
            }
        };

        let destined_to_us = notification.hashed_destination == self.address.hashed;
        if !self.strategy.accept(notification.control, destined_to_us) {
            tracing::debug!(
                id = hex::encode(&notification.hashed_id[..8]),
                "notification not accepted by strategy"
            );
            return;
        }

        // spray-and-wait tells the sender we now hold a copy
        if self.strategy.acknowledges() {
            self.transport.acknowledge(notification.hashed_id);
        }

        self.received_hashed_ids.insert(notification.hashed_id);

        if destined_to_us {
            if let Ok(terminal) = notification
                .control
                .with_destination_control(DestinationControl::Terminal)
            {
                notification.control = terminal;
            }
            self.inbox.push(notification.clone());
            tracing::info!(
                id = hex::encode(&notification.hashed_id[..8]),
                from = self
                    .address_book
                    .resolve_name(&notification.hashed_source)
                    .unwrap_or_else(|| hex::encode(&notification.hashed_source[..8])),
                "notification delivered"
            );
        }

        // in-memory state carries on even if persistence fails; the record
        // may be lost on restart
        if let Err(e) = self.store.insert(&notification) {
            tracing::error!(
                id = hex::encode(&notification.hashed_id[..8]),
                error = %e,
                "store persistence failure"
            );
        }

        self.transport.advertise(Address::fresh_tag());
    }

    /// Process a 32-byte acknowledgement from the transport.
    ///
    /// Returns false when the active strategy does not acknowledge, or when
    /// the ack is malformed or names an unknown notification.
    pub fn receive_acknowledgement(&mut self, ack: &[u8]) -> bool {
        if !self.strategy.acknowledges() {
            return false;
        }
        let Ok(hashed_id) = <[u8; 32]>::try_from(ack) else {
            tracing::warn!(len = ack.len(), "dropping malformed acknowledgement");
            return false;
        };

        match self.store.fetch_by_hashed_id(&hashed_id) {
            Ok(Some(notification)) => {
                let halved = notification.control.sequence_number() / 2;
                match self.store.set_sequence_number(&hashed_id, halved) {
                    Ok(()) => {
                        tracing::debug!(
                            id = hex::encode(&hashed_id[..8]),
                            copies = halved,
                            "copy budget halved"
                        );
                        true
                    }
                    Err(StoreError::InvalidControlByte(_)) => {
                        // the budget cannot shrink further: keep the last
                        // copy for direct contact with the destination
                        match self
                            .store
                            .set_destination_control(&hashed_id, DestinationControl::DirectOnly)
                        {
                            Ok(()) => {
                                tracing::debug!(
                                    id = hex::encode(&hashed_id[..8]),
                                    "entering wait phase"
                                );
                                true
                            }
                            Err(e) => {
                                tracing::error!(error = %e, "failed to enter wait phase");
                                false
                            }
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "failed to apply acknowledgement");
                        false
                    }
                }
            }
            Ok(None) => {
                tracing::debug!(
                    id = hex::encode(&hashed_id[..8]),
                    "acknowledgement for unknown notification"
                );
                false
            }
            Err(e) => {
                tracing::error!(error = %e, "store failure on acknowledgement");
                false
            }
        }
    }

    // ── Transmit path ─────────────────────────────────────────────────────────

    /// Stream transmittable notifications to the connected peer.
    ///
    /// Invoked by the transport on every readiness signal. Populates the
    /// queue from the store when empty, then drains it in order. A
    /// back-pressured send suspends the session without advancing the queue;
    /// the next readiness signal resumes from the same entry. Once every
    /// entry is sent, the end-of-session sentinel goes out and (on success)
    /// the queue is cleared.
    pub fn transmit_notifications(&mut self) {
        if self.transmit_queue.is_empty() {
            let snapshot = match self.store.fetch_all_transmittable() {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    tracing::error!(error = %e, "cannot build transmit queue");
                    return;
                }
            };
            self.transmit_queue
                .populate(snapshot.iter().map(|n| n.hashed_id));
            tracing::debug!(pending = self.transmit_queue.len(), "transmit queue built");
        }

        while let Some(hashed_id) = self.transmit_queue.next_unsent() {
            let record = match self.store.fetch_by_hashed_id(&hashed_id) {
                Ok(record) => record,
                Err(e) => {
                    tracing::error!(error = %e, "store failure during transmit");
                    return;
                }
            };
            // a record can turn terminal between snapshot and send
            // (delivered to us mid-session); skip it
            let Some(record) = record.filter(Notification::is_transmittable) else {
                self.transmit_queue.mark_sent(hashed_id);
                continue;
            };

            let mut outgoing = record;
            outgoing.control = self.strategy.transmit_control(outgoing.control);
            let frame = outgoing.to_frame();

            if self.transport.send(&frame) {
                tracing::trace!(
                    id = hex::encode(&hashed_id[..8]),
                    len = frame.len(),
                    "frame sent"
                );
                self.transmit_queue.mark_sent(hashed_id);
            } else {
                tracing::debug!(
                    id = hex::encode(&hashed_id[..8]),
                    "link back-pressured, suspending session"
                );
                return;
            }
        }

        // every data frame is out; close the session
        if self.transport.send(&wire::SENTINEL_FRAME) {
            tracing::debug!(sent = self.transmit_queue.len(), "session drained");
            self.transmit_queue.clear();
        } else {
            // sentinel retried on the next readiness signal; data frames
            // stay marked sent
            tracing::debug!("sentinel back-pressured, will retry");
        }
    }

    /// Forget the current session. Called by the embedder when the link
    /// drops mid-session; the next readiness signal rebuilds the queue from
    /// the store.
    pub fn session_closed(&mut self) {
        if !self.transmit_queue.is_empty() {
            tracing::debug!(
                pending = self.transmit_queue.len(),
                "session closed, discarding transmit queue"
            );
        }
        self.transmit_queue.clear();
    }

    // ── Embedder API ──────────────────────────────────────────────────────────

    /// Create a notification for `to` and queue it for dissemination.
    pub fn send(&mut self, message: &str, to: &Address) -> Result<Notification, EngineError> {
        let max = self.max_message_length();
        if message.len() > max {
            return Err(EngineError::MessageTooLong {
                len: message.len(),
                max,
            });
        }

        let control = self.strategy.initial_control()?;
        let notification = Notification::create(
            control,
            to.hashed,
            self.address.hashed,
            message.to_string(),
        );

        self.store.insert(&notification)?;
        self.received_hashed_ids.insert(notification.hashed_id);
        tracing::info!(
            id = hex::encode(&notification.hashed_id[..8]),
            to = self
                .address_book
                .resolve_name(&to.hashed)
                .unwrap_or_else(|| hex::encode(&to.hashed[..8])),
            "notification created"
        );

        self.transport.advertise(Address::fresh_tag());
        Ok(notification)
    }

    /// Change the spray-and-wait copy budget for future notifications.
    /// Fails on budgets outside 1..=15, or under any other strategy.
    pub fn set_number_of_copies(&mut self, copies: u8) -> Result<(), EngineError> {
        match self.strategy {
            Strategy::SprayAndWait { .. } => {
                Strategy::SprayAndWait { copies }.initial_control()?;
                self.strategy = Strategy::SprayAndWait { copies };
                Ok(())
            }
            _ => Err(EngineError::RequiresSprayAndWait),
        }
    }

    /// Weakest signal worth accepting, dBm. A hint the embedder forwards to
    /// the transport; the default −128 accepts everything.
    pub fn set_rssi_threshold(&mut self, threshold: i8) {
        self.rssi_threshold = threshold;
    }

    pub fn rssi_threshold(&self) -> i8 {
        self.rssi_threshold
    }

    /// This device's own address.
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Every known peer except ourselves.
    pub fn contacts(&self) -> Vec<Address> {
        self.address_book.contacts(&self.address.hashed)
    }

    pub fn address_book(&self) -> &AddressBook {
        &self.address_book
    }

    /// Notifications delivered to this device, oldest first.
    pub fn inbox(&self) -> &[Notification] {
        &self.inbox
    }

    /// Every hashed identifier this device has ever accepted or created.
    pub fn received_hashed_ids(&self) -> &HashSet<[u8; 32]> {
        &self.received_hashed_ids
    }

    /// Longest message body the transport's MTU allows.
    pub fn max_message_length(&self) -> usize {
        wire::max_message_length(self.transport.max_notification_length())
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Direct store access, for inspection tooling.
    pub fn store(&self) -> &dyn NotificationStore {
        self.store.as_ref()
    }
}
