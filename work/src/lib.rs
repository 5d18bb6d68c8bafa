//! Block hashing and proof-of-work.
//!
//! Not anti-spam tuning: the difficulty is a fixed two-hex-digit zero prefix,
//! so a proof is found after a few hundred hashes on average. What matters is
//! that every node computes the same digest for the same block.

pub mod error;
pub mod generator;
pub mod hash;
pub mod validator;

pub use error::WorkError;
pub use generator::proof_of_work;
pub use hash::{canonical_json, hash_block, sha256_hex};
pub use validator::{check_proof, valid_proof, PROOF_PREFIX};
