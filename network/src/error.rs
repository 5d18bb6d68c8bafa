use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("peer unreachable: {0}")]
    Unreachable(String),

    #[error("peer timed out: {0}")]
    Timeout(String),

    #[error("request failed: {0}")]
    RequestFailed(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("HTTP client setup failed: {0}")]
    ClientSetup(String),
}
