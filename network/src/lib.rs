//! Peer networking for DCNS nodes.
//!
//! Nodes talk over plain HTTP: consensus pulls a peer's chain dump, and a node
//! that just mined asks its peers to run consensus. Both directions sit behind
//! traits so ledgers and the resolver can be tested without sockets.

pub mod broadcast;
pub mod client;
pub mod error;
pub mod peer;

pub use broadcast::{BroadcastResult, PeerBroadcaster};
pub use client::HttpPeerClient;
pub use error::NetworkError;
pub use peer::{peer_authority, ChainFetcher, PeerNotifier};
