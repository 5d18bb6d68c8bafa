use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkError {
    #[error("proof {proof} does not satisfy last proof {last_proof}")]
    InvalidProof { last_proof: u64, proof: u64 },
}
