//! Which of the two ledgers an operation targets.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::TypesError;

/// One of the two independently mined chains.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainKind {
    /// Lease-priced, token-gated domain registration.
    Register,
    /// Free record updates; never expires.
    Dns,
}

impl ChainKind {
    pub const ALL: [ChainKind; 2] = [ChainKind::Register, ChainKind::Dns];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Register => "register",
            Self::Dns => "dns",
        }
    }

    /// File stem used for this chain's durable files.
    pub fn file_stem(&self) -> &'static str {
        match self {
            Self::Register => "register",
            Self::Dns => "dns",
        }
    }
}

impl fmt::Display for ChainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChainKind {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "register" => Ok(Self::Register),
            "dns" => Ok(Self::Dns),
            _ => Err(TypesError::UnknownChainKind(s.to_string())),
        }
    }
}

/// A chain selector for operations that accept "register", "dns" or "both".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainScope {
    Register,
    Dns,
    #[default]
    Both,
}

impl ChainScope {
    /// The chain kinds covered by this scope, register first.
    pub fn kinds(&self) -> &'static [ChainKind] {
        match self {
            Self::Register => &[ChainKind::Register],
            Self::Dns => &[ChainKind::Dns],
            Self::Both => &ChainKind::ALL,
        }
    }

    pub fn includes(&self, kind: ChainKind) -> bool {
        self.kinds().contains(&kind)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Register => "register",
            Self::Dns => "dns",
            Self::Both => "both",
        }
    }
}

impl From<ChainKind> for ChainScope {
    fn from(kind: ChainKind) -> Self {
        match kind {
            ChainKind::Register => Self::Register,
            ChainKind::Dns => Self::Dns,
        }
    }
}

impl FromStr for ChainScope {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "both" => Ok(Self::Both),
            other => other.parse::<ChainKind>().map(Self::from),
        }
    }
}

impl fmt::Display for ChainScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
