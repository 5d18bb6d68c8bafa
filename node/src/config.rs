//! Node configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use dcns_ledger::LedgerConfig;
use dcns_types::NodeId;

use crate::NodeError;

/// Configuration for a DCNS node.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Identifier this node mines and collects rewards under.
    #[serde(default = "default_node_id")]
    pub node_id: NodeId,

    /// Directory holding chain, staging and cache files.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// HTTP port for the RPC server.
    #[serde(default = "default_rpc_port")]
    pub rpc_port: u16,

    /// Peers registered on both chains at startup.
    #[serde(default)]
    pub bootstrap_peers: Vec<String>,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub ledger: LedgerParams,
}

/// Economic and batching parameters shared by both chains.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerParams {
    /// Pending transactions that trigger an immediate mine. At least 2.
    #[serde(default = "default_ten")]
    pub auto_mine_threshold: usize,
    /// Staged entries that trigger an immediate flush.
    #[serde(default = "default_ten")]
    pub staging_threshold: usize,
    /// Seconds between periodic staging flushes.
    #[serde(default = "default_flush_interval_secs")]
    pub flush_interval_secs: u64,
    #[serde(default = "default_mine_reward")]
    pub mine_reward: i64,
    /// Flat part of a lease price.
    #[serde(default = "default_base_cost")]
    pub base_cost: i64,
    #[serde(default = "default_lease_cost_per_year")]
    pub lease_cost_per_year: i64,
    /// Token balance every identifier starts with.
    #[serde(default = "default_initial_balance")]
    pub initial_balance: i64,
    #[serde(default = "default_seconds_per_year")]
    pub seconds_per_year: u64,
    /// Per-peer bound on consensus queries and HTTP requests.
    #[serde(default = "default_peer_timeout_secs")]
    pub peer_timeout_secs: u64,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_node_id() -> NodeId {
    NodeId::new("dcns-node")
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_rpc_port() -> u16 {
    5000
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_ten() -> usize {
    10
}

fn default_flush_interval_secs() -> u64 {
    60
}

fn default_mine_reward() -> i64 {
    10
}

fn default_base_cost() -> i64 {
    2
}

fn default_lease_cost_per_year() -> i64 {
    2
}

fn default_initial_balance() -> i64 {
    10
}

fn default_seconds_per_year() -> u64 {
    31_536_000
}

fn default_peer_timeout_secs() -> u64 {
    5
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, NodeError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| NodeError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        let config: Self = toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Reject parameter combinations the node cannot run with.
    pub fn validate(&self) -> Result<(), NodeError> {
        let p = &self.ledger;
        if p.auto_mine_threshold < 2 {
            // A lone reward transaction would seal a block that queues another reward.
            return Err(NodeError::Config(
                "ledger.auto_mine_threshold must be at least 2".into(),
            ));
        }
        if p.staging_threshold == 0 {
            return Err(NodeError::Config("ledger.staging_threshold must be positive".into()));
        }
        if p.flush_interval_secs == 0 {
            return Err(NodeError::Config("ledger.flush_interval_secs must be positive".into()));
        }
        if p.base_cost < 0 || p.lease_cost_per_year < 0 || p.mine_reward < 0 {
            return Err(NodeError::Config("ledger costs and rewards must not be negative".into()));
        }
        Ok(())
    }
}

impl LedgerParams {
    /// Tokens charged for leasing a hostname for `lease_years`.
    pub fn lease_cost(&self, lease_years: u32) -> i64 {
        self.base_cost + self.lease_cost_per_year * i64::from(lease_years)
    }

    /// Lease length in seconds.
    pub fn lease_secs(&self, lease_years: u32) -> u64 {
        self.seconds_per_year.saturating_mul(u64::from(lease_years))
    }

    pub fn peer_timeout(&self) -> Duration {
        Duration::from_secs(self.peer_timeout_secs)
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_secs)
    }

    /// Settings for each of the two ledgers.
    pub fn ledger_config(&self) -> LedgerConfig {
        LedgerConfig {
            auto_mine_threshold: self.auto_mine_threshold.max(2),
            initial_quota: self.initial_balance,
            peer_timeout: self.peer_timeout(),
        }
    }
}

impl Default for LedgerParams {
    fn default() -> Self {
        Self {
            auto_mine_threshold: default_ten(),
            staging_threshold: default_ten(),
            flush_interval_secs: default_flush_interval_secs(),
            mine_reward: default_mine_reward(),
            base_cost: default_base_cost(),
            lease_cost_per_year: default_lease_cost_per_year(),
            initial_balance: default_initial_balance(),
            seconds_per_year: default_seconds_per_year(),
            peer_timeout_secs: default_peer_timeout_secs(),
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
            data_dir: default_data_dir(),
            rpc_port: default_rpc_port(),
            bootstrap_peers: Vec::new(),
            log_format: default_log_format(),
            log_level: default_log_level(),
            ledger: LedgerParams::default(),
        }
    }
}
