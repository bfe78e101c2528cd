//! Transport seam — the contract between the engine and the link layer.
//!
//! The radio (connection establishment, advertisement broadcast, MTU
//! negotiation, link-layer retransmits) lives outside the engine. The
//! transport calls back into the engine from the engine's single logical
//! thread: `receive_notification` for data frames, `receive_acknowledgement`
//! for acks, and `transmit_notifications` whenever the link is ready to
//! accept a frame.

/// Operations the engine requires from a transport.
///
/// Intentionally minimal. No connection management — the transport decides
/// when peers appear and signals readiness; the engine only reacts.
pub trait Transport {
    /// MTU for a single frame. Must be at least the 105-byte minimum.
    fn max_notification_length(&self) -> usize;

    /// Attempt to send one frame to the current peer.
    /// Returns false on back-pressure; the engine suspends and retries the
    /// same frame on the next readiness signal.
    fn send(&mut self, frame: &[u8]) -> bool;

    /// Fire-and-forget 32-byte acknowledgement to the current peer.
    fn acknowledge(&mut self, hashed_id: [u8; 32]);

    /// Tear down the current peer session.
    fn disconnect(&mut self);

    /// Republish presence under a fresh tag.
    fn advertise(&mut self, tag: String);
}
