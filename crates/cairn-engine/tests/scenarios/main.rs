//! End-to-end scenarios against a scripted transport.
//!
//! The TestLink stands in for the radio: it records every frame, ack,
//! advertisement, and disconnect the engine asks for, and can be programmed
//! to back-pressure specific send attempts.

mod persistence;
mod session;
mod spray;

use std::collections::HashSet;

use cairn_engine::{AddressBook, Engine, MemoryStore, Strategy, Transport};

pub const MTU: usize = 512;

/// A scripted link: every interaction the engine has with the transport is
/// recorded for assertions.
pub struct TestLink {
    pub mtu: usize,
    pub sent: Vec<Vec<u8>>,
    pub acks: Vec<[u8; 32]>,
    pub advertisements: Vec<String>,
    pub disconnects: usize,
    /// Zero-based send-attempt indices that report back-pressure.
    pub backpressure_at: HashSet<usize>,
    pub send_attempts: usize,
}

impl Default for TestLink {
    fn default() -> Self {
        Self {
            mtu: MTU,
            sent: Vec::new(),
            acks: Vec::new(),
            advertisements: Vec::new(),
            disconnects: 0,
            backpressure_at: HashSet::new(),
            send_attempts: 0,
        }
    }
}

impl Transport for TestLink {
    fn max_notification_length(&self) -> usize {
        self.mtu
    }

    fn send(&mut self, frame: &[u8]) -> bool {
        let attempt = self.send_attempts;
        self.send_attempts += 1;
        if self.backpressure_at.contains(&attempt) {
            return false;
        }
        self.sent.push(frame.to_vec());
        true
    }

    fn acknowledge(&mut self, hashed_id: [u8; 32]) {
        self.acks.push(hashed_id);
    }

    fn disconnect(&mut self) {
        self.disconnects += 1;
    }

    fn advertise(&mut self, tag: String) {
        self.advertisements.push(tag);
    }
}

/// A fresh engine over an in-memory store and a scripted link.
pub fn engine(strategy: Strategy) -> Engine<TestLink> {
    Engine::new(
        TestLink::default(),
        Box::new(MemoryStore::new()),
        strategy,
        AddressBook::new(),
    )
    .expect("engine construction")
}

/// Run one full transmit session and hand back everything that went out
/// (data frames followed by the sentinel, when the link cooperated).
pub fn drain_session(engine: &mut Engine<TestLink>) -> Vec<Vec<u8>> {
    engine.transmit_notifications();
    engine.transport_mut().sent.drain(..).collect()
}

/// Feed a batch of frames into a receiving engine, in order.
pub fn deliver(frames: &[Vec<u8>], to: &mut Engine<TestLink>) {
    for frame in frames {
        to.receive_notification(frame);
    }
}
