//! Persistence traits for the DCNS node.
//!
//! Ledgers, staging queues and the derived cache depend only on these traits.
//! [`JsonFileStore`] is the on-disk backend; `dcns-nullables` provides
//! in-memory stand-ins for tests.

pub mod cache;
pub mod chain;
pub mod error;
pub mod json;
pub mod staging;

pub use cache::{CacheSnapshot, CacheStore, CachedRecord};
pub use chain::ChainStore;
pub use error::StoreError;
pub use json::JsonFileStore;
pub use staging::StagingStore;
