//! One hash-linked, proof-of-work chain.
//!
//! A node runs two of these side by side (register and DNS). Each owns its
//! blocks, a buffer of pending transactions and a set of peers, all behind a
//! single mutex. Consensus is plain longest-valid-chain.

pub mod consensus;
pub mod error;
pub mod ledger;
pub mod validation;

pub use error::LedgerError;
pub use ledger::{Ledger, LedgerConfig, SubmitOutcome};
pub use validation::{valid_chain, validate_chain, validate_dump};
