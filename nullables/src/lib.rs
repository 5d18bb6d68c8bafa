//! Nullable infrastructure for deterministic testing.
//!
//! Every external dependency of a node (clock, peers, disk) sits behind a
//! trait. The types here implement those traits in memory so tests:
//! - see deterministic values
//! - can steer time and peer behaviour programmatically
//! - never touch the filesystem or the network
//!
//! Usage: swap real implementations for nullables in tests.

pub mod clock;
pub mod network;
pub mod store;

pub use clock::NullClock;
pub use network::NullPeerNetwork;
pub use store::{NullCacheStore, NullChainStore, NullStagingStore};
