//! Proof search.

use crate::validator::valid_proof;

/// Find the smallest `proof` such that `valid_proof(last_proof, proof)` holds.
///
/// Single-threaded linear search starting at zero. With a two-hex-digit
/// prefix the expected number of attempts is 256.
pub fn proof_of_work(last_proof: u64) -> u64 {
    let mut proof = 0u64;
    while !valid_proof(last_proof, proof) {
        proof = proof.wrapping_add(1);
    }
    proof
}
