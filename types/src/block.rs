//! Block structure shared by both chains.

use serde::{Deserialize, Serialize};

use crate::{DnsRecord, NodeId, Timestamp, Transaction};

/// Proof value of the synthesized first block.
pub const GENESIS_PROOF: u64 = 100;

/// Sentinel `previous_hash` of the synthesized first block.
pub const GENESIS_PREVIOUS_HASH: &str = "1";

/// A hash-linked, proof-carrying batch of transactions.
///
/// Immutable once appended. `index` is 1-based and grows by one per block;
/// `previous_hash` is the canonical hash of the block before it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    /// Identifier of the node that sealed this block.
    pub source: NodeId,
    pub timestamp: Timestamp,
    pub transactions: Vec<Transaction>,
    pub proof: u64,
    pub previous_hash: String,
}

impl Block {
    /// The first block of a chain: no transactions, fixed proof and sentinel link.
    pub fn genesis(source: NodeId, timestamp: Timestamp) -> Self {
        Self {
            index: 1,
            source,
            timestamp,
            transactions: Vec::new(),
            proof: GENESIS_PROOF,
            previous_hash: GENESIS_PREVIOUS_HASH.to_string(),
        }
    }

    pub fn is_genesis(&self) -> bool {
        self.index == 1 && self.previous_hash == GENESIS_PREVIOUS_HASH
    }

    /// DNS records carried by this block, in transaction order.
    pub fn dns_records(&self) -> impl Iterator<Item = &DnsRecord> {
        self.transactions.iter().filter_map(Transaction::as_dns_record)
    }
}

/// A full chain as served by a node's chain-dump endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainDump {
    pub chain: Vec<Block>,
    pub length: usize,
}

impl ChainDump {
    pub fn new(chain: Vec<Block>) -> Self {
        let length = chain.len();
        Self { chain, length }
    }

    /// Whether the advertised length matches the number of blocks carried.
    pub fn is_consistent(&self) -> bool {
        self.length == self.chain.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MiningReward, TokenPayment};

    #[test]
    fn genesis_shape() {
        let block = Block::genesis(NodeId::new("owner"), Timestamp::new(5));
        assert_eq!(block.index, 1);
        assert_eq!(block.proof, GENESIS_PROOF);
        assert_eq!(block.previous_hash, "1");
        assert!(block.transactions.is_empty());
        assert!(block.is_genesis());
    }

    #[test]
    fn dns_records_skip_other_transactions() {
        let mut block = Block::genesis(NodeId::new("owner"), Timestamp::new(5));
        block.transactions = vec![
            Transaction::MiningReward(MiningReward {
                node_id: NodeId::new("owner"),
                block_index: 1,
                reward: 10,
            }),
            Transaction::DnsRecord(DnsRecord {
                hostname: "a.dc".into(),
                ip: "10.0.0.1".into(),
                port: 80,
                node_id: NodeId::new("owner"),
                lease_years: 1,
            }),
            Transaction::TokenPayment(TokenPayment {
                from: NodeId::new("owner"),
                amount: 4,
                for_hostname: "a.dc".into(),
                timestamp: Timestamp::new(5),
            }),
        ];
        let hosts: Vec<&str> = block.dns_records().map(|r| r.hostname.as_str()).collect();
        assert_eq!(hosts, vec!["a.dc"]);
    }

    #[test]
    fn dump_consistency() {
        let dump = ChainDump::new(vec![Block::genesis(NodeId::new("o"), Timestamp::EPOCH)]);
        assert!(dump.is_consistent());
        let lying = ChainDump {
            chain: dump.chain.clone(),
            length: 7,
        };
        assert!(!lying.is_consistent());
    }
}
