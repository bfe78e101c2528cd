//! Per-session transmit queue.
//!
//! One queue per outgoing session, populated from a store snapshot when
//! empty and cleared only by a successful end-of-session sentinel. Entries
//! keep a sent-mark so a back-pressured session resumes from the first
//! unsent entry; nothing is sent twice and nothing is skipped within one
//! session.

/// One pending notification in the current session.
#[derive(Debug, Clone)]
struct QueueEntry {
    hashed_id: [u8; 32],
    sent: bool,
}

/// The transmit queue for the current peer session.
///
/// Iteration order is the population order, which is stable for the life of
/// the queue.
#[derive(Debug, Default)]
pub struct TransmitQueue {
    entries: Vec<QueueEntry>,
}

impl TransmitQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Fill the queue from a snapshot of transmittable identifiers.
    /// Every entry starts unsent.
    pub fn populate(&mut self, ids: impl IntoIterator<Item = [u8; 32]>) {
        self.entries = ids
            .into_iter()
            .map(|hashed_id| QueueEntry {
                hashed_id,
                sent: false,
            })
            .collect();
    }

    /// The first entry not yet marked sent, in population order.
    pub fn next_unsent(&self) -> Option<[u8; 32]> {
        self.entries
            .iter()
            .find(|entry| !entry.sent)
            .map(|entry| entry.hashed_id)
    }

    /// Mark an entry as sent.
    pub fn mark_sent(&mut self, hashed_id: [u8; 32]) {
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|entry| entry.hashed_id == hashed_id)
        {
            entry.sent = true;
        }
    }

    /// True when every entry has been sent (trivially true when empty).
    pub fn fully_sent(&self) -> bool {
        self.entries.iter().all(|entry| entry.sent)
    }

    /// Drop all entries and their sent-marks.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
