//! Proof validation.

use crate::hash::sha256_hex;
use crate::WorkError;

/// Required leading characters of the proof digest.
pub const PROOF_PREFIX: &str = "00";

/// Check `sha256("{last_proof}{proof}")` starts with [`PROOF_PREFIX`].
///
/// The two numbers are concatenated as decimal strings with no separator.
pub fn valid_proof(last_proof: u64, proof: u64) -> bool {
    let guess = format!("{last_proof}{proof}");
    sha256_hex(guess.as_bytes()).starts_with(PROOF_PREFIX)
}

/// Like [`valid_proof`] but reports the failing pair.
pub fn check_proof(last_proof: u64, proof: u64) -> Result<(), WorkError> {
    if valid_proof(last_proof, proof) {
        Ok(())
    } else {
        Err(WorkError::InvalidProof { last_proof, proof })
    }
}
