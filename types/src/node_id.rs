//! Node identifier: the owner of a ledger, the payer of a lease, the miner of a block.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::TypesError;

/// Identifies a participant on both chains.
///
/// Usually a wallet address (`DC` + 40 hex characters), but any non-empty
/// string is accepted: the ledgers do not verify ownership of identifiers.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Prefix carried by wallet-derived addresses.
    pub const WALLET_PREFIX: &'static str = "DC";
    /// Length of a wallet-derived address (prefix + 20 bytes hex).
    pub const WALLET_LEN: usize = 42;

    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Return the raw identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this identifier has the shape of a wallet address.
    pub fn is_wallet_address(&self) -> bool {
        self.0.len() == Self::WALLET_LEN
            && self.0.starts_with(Self::WALLET_PREFIX)
            && self.0[Self::WALLET_PREFIX.len()..]
                .bytes()
                .all(|b| b.is_ascii_hexdigit())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for NodeId {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.chars().any(char::is_whitespace) {
            return Err(TypesError::InvalidNodeId(s.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
