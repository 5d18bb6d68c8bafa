//! Chain validity: hash linkage plus proof-of-work between neighbours.

use crate::LedgerError;
use dcns_types::{Block, ChainDump};
use dcns_work::{hash_block, valid_proof};

/// Check every adjacent pair of `chain`.
///
/// For each block after the first, `previous_hash` must equal the hash of the
/// block before it and its proof must satisfy the predecessor's proof. Chains
/// of length 0 or 1 are valid.
pub fn validate_chain(chain: &[Block]) -> Result<(), LedgerError> {
    for pair in chain.windows(2) {
        let (prior, current) = (&pair[0], &pair[1]);
        let expected = hash_block(prior);
        if current.previous_hash != expected {
            return Err(LedgerError::InvalidChain {
                index: current.index,
                reason: format!(
                    "previous_hash {} does not match hash of block {} ({expected})",
                    current.previous_hash, prior.index
                ),
            });
        }
        if !valid_proof(prior.proof, current.proof) {
            return Err(LedgerError::InvalidChain {
                index: current.index,
                reason: format!(
                    "proof {} does not satisfy previous proof {}",
                    current.proof, prior.proof
                ),
            });
        }
    }
    Ok(())
}

pub fn valid_chain(chain: &[Block]) -> bool {
    validate_chain(chain).is_ok()
}

/// Validate a peer's dump, including that its advertised length is honest.
pub fn validate_dump(dump: &ChainDump) -> Result<(), LedgerError> {
    if !dump.is_consistent() {
        return Err(LedgerError::InvalidChain {
            index: dump.chain.len() as u64,
            reason: format!(
                "reported length {} but carries {} blocks",
                dump.length,
                dump.chain.len()
            ),
        });
    }
    validate_chain(&dump.chain)
}
