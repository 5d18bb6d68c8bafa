//! Incoming entries and their validation.

use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::ResolverError;
use dcns_types::{ChainKind, NodeId};

/// Longest hostname accepted.
pub const MAX_HOSTNAME_LEN: usize = 253;

/// A request to add a record to one of the chains.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewEntry {
    pub hostname: String,
    pub ip: String,
    pub port: u16,
    pub chain_kind: ChainKind,
    /// Ignored on the DNS chain, whose records never expire.
    pub lease_years: u32,
    /// Payer and owner; the node's own identifier when absent.
    pub node_id: Option<NodeId>,
}

impl NewEntry {
    pub fn register(hostname: &str, ip: &str, port: u16, lease_years: u32) -> Self {
        Self {
            hostname: hostname.to_string(),
            ip: ip.to_string(),
            port,
            chain_kind: ChainKind::Register,
            lease_years,
            node_id: None,
        }
    }

    pub fn dns(hostname: &str, ip: &str, port: u16) -> Self {
        Self {
            hostname: hostname.to_string(),
            ip: ip.to_string(),
            port,
            chain_kind: ChainKind::Dns,
            lease_years: 0,
            node_id: None,
        }
    }

    pub fn paid_by(mut self, node_id: NodeId) -> Self {
        self.node_id = Some(node_id);
        self
    }

    pub fn validate(&self) -> Result<(), ResolverError> {
        validate_hostname(&self.hostname)?;
        self.ip
            .parse::<IpAddr>()
            .map_err(|_| ResolverError::Validation(format!("invalid ip address {:?}", self.ip)))?;
        if self.chain_kind == ChainKind::Register && self.lease_years == 0 {
            return Err(ResolverError::Validation(
                "lease_years must be at least 1".into(),
            ));
        }
        if let Some(node_id) = &self.node_id {
            node_id
                .as_str()
                .parse::<NodeId>()
                .map_err(|e| ResolverError::Validation(e.to_string()))?;
        }
        Ok(())
    }
}

pub fn validate_hostname(hostname: &str) -> Result<(), ResolverError> {
    if hostname.is_empty() {
        return Err(ResolverError::Validation("hostname is required".into()));
    }
    if hostname.len() > MAX_HOSTNAME_LEN {
        return Err(ResolverError::Validation(format!(
            "hostname longer than {MAX_HOSTNAME_LEN} characters"
        )));
    }
    if hostname.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(ResolverError::Validation(format!(
            "hostname {hostname:?} contains whitespace"
        )));
    }
    Ok(())
}

/// One loosely-typed entry of a batch submission, keyed by the client.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEntry {
    #[serde(default)]
    pub key: String,
    pub hostname: Option<String>,
    pub ip: Option<String>,
    pub port: Option<i64>,
    pub wallet_address: Option<String>,
}

impl RawEntry {
    /// Check presence and ranges, producing a DNS-chain entry.
    pub fn into_dns_entry(self) -> Result<NewEntry, ResolverError> {
        let hostname = self
            .hostname
            .ok_or_else(|| ResolverError::Validation("hostname is required".into()))?;
        let ip = self
            .ip
            .ok_or_else(|| ResolverError::Validation("ip is required".into()))?;
        let port = self
            .port
            .ok_or_else(|| ResolverError::Validation("port is required".into()))?;
        let port = u16::try_from(port)
            .map_err(|_| ResolverError::Validation(format!("port {port} out of range")))?;
        let node_id = self
            .wallet_address
            .map(|addr| {
                addr.parse::<NodeId>()
                    .map_err(|e| ResolverError::Validation(e.to_string()))
            })
            .transpose()?;

        let entry = NewEntry {
            node_id,
            ..NewEntry::dns(&hostname, &ip, port)
        };
        entry.validate()?;
        Ok(entry)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedEntry {
    pub key: String,
    pub reason: String,
}

/// Per-entry outcome of a batch submission.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub accepted: Vec<String>,
    pub rejected: Vec<RejectedEntry>,
}

/// What happened to an accepted entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryReceipt {
    pub hostname: String,
    pub chain_kind: ChainKind,
    /// Tokens charged; zero on the DNS chain.
    pub cost: i64,
    /// Whether the staging queue was flushed into the ledger by this entry.
    pub flushed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_register_entry() {
        assert!(NewEntry::register("alice.dc", "192.0.2.1", 8080, 1).validate().is_ok());
        assert!(NewEntry::register("v6.dc", "2001:db8::1", 0, 3).validate().is_ok());
    }

    #[test]
    fn rejects_malformed_fields() {
        let cases = [
            NewEntry::register("", "192.0.2.1", 80, 1),
            NewEntry::register("two words.dc", "192.0.2.1", 80, 1),
            NewEntry::register("a.dc", "not-an-ip", 80, 1),
            NewEntry::register("a.dc", "192.0.2.1", 80, 0),
            NewEntry::register(&"x".repeat(MAX_HOSTNAME_LEN + 1), "192.0.2.1", 80, 1),
        ];
        for entry in cases {
            assert!(
                matches!(entry.validate(), Err(ResolverError::Validation(_))),
                "{entry:?} should be rejected"
            );
        }
    }

    #[test]
    fn dns_entry_needs_no_lease() {
        assert!(NewEntry::dns("free.dc", "10.0.0.1", 53).validate().is_ok());
    }

    #[test]
    fn raw_entry_conversion() {
        let raw = RawEntry {
            key: "0".into(),
            hostname: Some("b.dc".into()),
            ip: Some("10.0.0.2".into()),
            port: Some(8080),
            wallet_address: Some("payer".into()),
        };
        let entry = raw.into_dns_entry().unwrap();
        assert_eq!(entry.port, 8080);
        assert_eq!(entry.chain_kind, ChainKind::Dns);
        assert_eq!(entry.node_id, Some(NodeId::new("payer")));
    }

    #[test]
    fn raw_entry_port_out_of_range() {
        let raw = RawEntry {
            hostname: Some("b.dc".into()),
            ip: Some("10.0.0.2".into()),
            port: Some(70_000),
            ..RawEntry::default()
        };
        assert!(matches!(raw.into_dns_entry(), Err(ResolverError::Validation(_))));
    }

    #[test]
    fn raw_entry_missing_ip() {
        let raw = RawEntry {
            hostname: Some("b.dc".into()),
            port: Some(1),
            ..RawEntry::default()
        };
        let err = raw.into_dns_entry().unwrap_err();
        assert!(err.to_string().contains("ip is required"));
    }
}
