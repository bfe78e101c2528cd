//! cairn-engine — opportunistic, delay-tolerant notification dissemination.
//!
//! Short messages routed between mobile peers over an intermittently
//! connected broadcast link. Three forwarding strategies (direct delivery,
//! epidemic routing, binary spray-and-wait) share one wire format, one
//! persistent store, and one per-session transmit protocol. The radio
//! itself lives behind the [`Transport`] trait.

pub mod address_book;
pub mod engine;
pub mod session;
pub mod store;
pub mod strategy;
pub mod transport;

pub use address_book::AddressBook;
pub use engine::{Engine, EngineError};
pub use store::{MemoryStore, NotificationStore, SqliteStore, StoreError};
pub use strategy::Strategy;
pub use transport::Transport;
