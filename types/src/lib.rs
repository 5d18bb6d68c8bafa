//! Fundamental types for the DCNS ledgers.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! blocks, transactions, chain kinds, node identifiers, and timestamps.

pub mod block;
pub mod chain;
pub mod error;
pub mod node_id;
pub mod time;
pub mod transaction;

pub use block::{Block, ChainDump, GENESIS_PREVIOUS_HASH, GENESIS_PROOF};
pub use chain::{ChainKind, ChainScope};
pub use error::TypesError;
pub use node_id::NodeId;
pub use time::{Clock, SystemClock, Timestamp};
pub use transaction::{DnsRecord, MiningReward, TokenPayment, TokenTransfer, Transaction};
