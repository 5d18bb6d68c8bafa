//! DCNS node: a name service resolving hostnames through two ledgers.
//!
//! The [`Resolver`] coordinates:
//! - the register chain, where hostnames are leased for tokens
//! - the DNS chain, which carries free record updates and every confirmed lease
//! - durable staging queues flushed on size or on a timer
//! - token balances replayed from register-chain history
//! - the derived hostname cache

pub mod cache;
pub mod config;
pub mod entry;
pub mod error;
pub mod logging;
pub mod node;
pub mod resolver;
pub mod shutdown;
pub mod staging;
pub mod status;
pub mod timers;
pub mod tokens;

pub use cache::DnsCache;
pub use config::{LedgerParams, NodeConfig};
pub use entry::{BatchOutcome, EntryReceipt, NewEntry, RawEntry, RejectedEntry};
pub use error::{NodeError, ResolverError};
pub use logging::{init_logging, LogFormat};
pub use node::DcnsNode;
pub use resolver::{BufferDump, ChainView, Resolver, ResolverDeps};
pub use shutdown::ShutdownController;
pub use staging::StagingQueue;
pub use status::{DomainLease, DomainStatus, Resolution};
pub use timers::spawn_flush_timers;
pub use tokens::TokenReplay;
