//! Token balances derived by replaying register-chain history.
//!
//! Nothing here is stored as truth: balances are recomputed from the chain,
//! the register ledger's pending buffer and the register staging queue.

use std::collections::BTreeMap;

use dcns_types::{NodeId, Transaction};

/// Accumulated balance changes per identifier.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TokenReplay {
    deltas: BTreeMap<NodeId, i64>,
}

impl TokenReplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, tx: &Transaction) {
        match tx {
            Transaction::MiningReward(reward) => {
                *self.entry(&reward.node_id) += reward.reward;
            }
            Transaction::TokenPayment(payment) => {
                *self.entry(&payment.from) -= payment.amount;
            }
            Transaction::TokenTransfer(transfer) => {
                *self.entry(&transfer.from) -= transfer.amount;
                *self.entry(&transfer.to) += transfer.amount;
            }
            // Records move no tokens but make their owner show up in the snapshot.
            Transaction::DnsRecord(record) => {
                self.entry(&record.node_id);
            }
        }
    }

    pub fn apply_all<'a>(&mut self, txs: impl IntoIterator<Item = &'a Transaction>) {
        for tx in txs {
            self.apply(tx);
        }
    }

    fn entry(&mut self, id: &NodeId) -> &mut i64 {
        self.deltas.entry(id.clone()).or_insert(0)
    }

    /// Balance of `id` given every identifier starts at `initial`.
    pub fn balance(&self, id: &NodeId, initial: i64) -> i64 {
        initial + self.deltas.get(id).copied().unwrap_or(0)
    }

    /// Balances of every identifier seen during the replay.
    pub fn balances(&self, initial: i64) -> BTreeMap<NodeId, i64> {
        self.deltas
            .iter()
            .map(|(id, delta)| (id.clone(), initial + delta))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcns_types::{DnsRecord, MiningReward, Timestamp, TokenPayment, TokenTransfer};

    fn id(s: &str) -> NodeId {
        NodeId::new(s)
    }

    #[test]
    fn unknown_identifier_has_initial_balance() {
        assert_eq!(TokenReplay::new().balance(&id("nobody"), 10), 10);
    }

    #[test]
    fn rewards_payments_and_transfers() {
        let txs = vec![
            Transaction::MiningReward(MiningReward {
                node_id: id("miner"),
                block_index: 2,
                reward: 10,
            }),
            Transaction::TokenPayment(TokenPayment {
                from: id("alice"),
                amount: 4,
                for_hostname: "alice.dc".into(),
                timestamp: Timestamp::new(1),
            }),
            Transaction::TokenTransfer(TokenTransfer {
                from: id("miner"),
                to: id("alice"),
                amount: 3,
                timestamp: Timestamp::new(2),
            }),
        ];
        let mut replay = TokenReplay::new();
        replay.apply_all(&txs);
        assert_eq!(replay.balance(&id("miner"), 10), 17);
        assert_eq!(replay.balance(&id("alice"), 10), 9);
    }

    #[test]
    fn record_owner_is_listed_without_change() {
        let mut replay = TokenReplay::new();
        replay.apply(&Transaction::DnsRecord(DnsRecord {
            hostname: "x.dc".into(),
            ip: "10.0.0.1".into(),
            port: 1,
            node_id: id("owner"),
            lease_years: 1,
        }));
        let balances = replay.balances(10);
        assert_eq!(balances.get(&id("owner")), Some(&10));
    }
}
