//! Transaction payloads carried by blocks on either chain.
//!
//! Transactions are unsigned. Serialized as an internally tagged JSON object
//! (`"type": "dns_record" | "mining_reward" | "token_payment" | "token_transfer"`)
//! so the on-disk chain files and the peer chain-dump endpoint share one format.

use serde::{Deserialize, Serialize};

use crate::{NodeId, Timestamp};

/// A hostname → (ip, port) record, optionally lease-priced on the register chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecord {
    pub hostname: String,
    pub ip: String,
    pub port: u16,
    pub node_id: NodeId,
    pub lease_years: u32,
}

/// Credit for the node that sealed block `block_index`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MiningReward {
    pub node_id: NodeId,
    pub block_index: u64,
    pub reward: i64,
}

/// Debit paid for registering (leasing) a hostname.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPayment {
    pub from: NodeId,
    pub amount: i64,
    pub for_hostname: String,
    pub timestamp: Timestamp,
}

/// Tokens moved from one node to another.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenTransfer {
    pub from: NodeId,
    pub to: NodeId,
    pub amount: i64,
    pub timestamp: Timestamp,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Transaction {
    DnsRecord(DnsRecord),
    MiningReward(MiningReward),
    TokenPayment(TokenPayment),
    TokenTransfer(TokenTransfer),
}

impl Transaction {
    /// The hostname this transaction resolves, if it is a DNS record.
    pub fn as_dns_record(&self) -> Option<&DnsRecord> {
        match self {
            Self::DnsRecord(record) => Some(record),
            _ => None,
        }
    }

    /// Whether this transaction carries a record for `hostname`.
    pub fn is_record_for(&self, hostname: &str) -> bool {
        self.as_dns_record()
            .is_some_and(|record| record.hostname == hostname)
    }

    /// Every node identifier mentioned by this transaction.
    pub fn participants(&self) -> Vec<&NodeId> {
        match self {
            Self::DnsRecord(r) => vec![&r.node_id],
            Self::MiningReward(r) => vec![&r.node_id],
            Self::TokenPayment(p) => vec![&p.from],
            Self::TokenTransfer(t) => vec![&t.from, &t.to],
        }
    }

    /// Short variant name for logs.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::DnsRecord(_) => "dns_record",
            Self::MiningReward(_) => "mining_reward",
            Self::TokenPayment(_) => "token_payment",
            Self::TokenTransfer(_) => "token_transfer",
        }
    }
}

impl From<DnsRecord> for Transaction {
    fn from(record: DnsRecord) -> Self {
        Self::DnsRecord(record)
    }
}

impl From<MiningReward> for Transaction {
    fn from(reward: MiningReward) -> Self {
        Self::MiningReward(reward)
    }
}

impl From<TokenPayment> for Transaction {
    fn from(payment: TokenPayment) -> Self {
        Self::TokenPayment(payment)
    }
}

impl From<TokenTransfer> for Transaction {
    fn from(transfer: TokenTransfer) -> Self {
        Self::TokenTransfer(transfer)
    }
}
