//! Canonical block hashing.

use dcns_types::Block;
use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Compact JSON of `block` with object keys in sorted order.
///
/// Going through `serde_json::Value` sorts keys (its map is a `BTreeMap`
/// unless `preserve_order` is enabled, which this workspace never does).
pub fn canonical_json(block: &Block) -> String {
    match serde_json::to_value(block) {
        Ok(value) => value.to_string(),
        // Block holds only strings, integers and enums; serialization cannot fail.
        Err(_) => String::new(),
    }
}

/// Hex SHA-256 of the canonical JSON form of `block`.
pub fn hash_block(block: &Block) -> String {
    sha256_hex(canonical_json(block).as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcns_types::{DnsRecord, NodeId, Timestamp, Transaction};

    fn sample() -> Block {
        let mut block = Block::genesis(NodeId::new("owner"), Timestamp::new(1_700_000_000));
        block.transactions.push(Transaction::DnsRecord(DnsRecord {
            hostname: "alice.dc".into(),
            ip: "192.0.2.1".into(),
            port: 80,
            node_id: NodeId::new("owner"),
            lease_years: 1,
        }));
        block
    }

    #[test]
    fn hash_is_64_hex_chars() {
        let h = hash_block(&sample());
        assert_eq!(h.len(), 64);
        assert!(h.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase()));
    }

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(hash_block(&sample()), hash_block(&sample()));
    }

    #[test]
    fn keys_are_sorted() {
        let json = canonical_json(&sample());
        let idx = |key: &str| json.find(&format!("\"{key}\"")).unwrap();
        assert!(idx("index") < idx("previous_hash"));
        assert!(idx("previous_hash") < idx("proof"));
        assert!(idx("proof") < idx("source"));
        assert!(idx("source") < idx("timestamp"));
        assert!(idx("timestamp") < idx("transactions"));
    }

    #[test]
    fn key_order_of_source_document_does_not_matter() {
        let block = sample();
        let reordered = r#"{"transactions":[{"lease_years":1,"node_id":"owner","port":80,"ip":"192.0.2.1","hostname":"alice.dc","type":"dns_record"}],"timestamp":1700000000,"source":"owner","proof":100,"previous_hash":"1","index":1}"#;
        let parsed: Block = serde_json::from_str(reordered).unwrap();
        assert_eq!(hash_block(&parsed), hash_block(&block));
    }

    #[test]
    fn any_field_change_changes_hash() {
        let base = sample();
        let mut other = base.clone();
        other.proof += 1;
        assert_ne!(hash_block(&base), hash_block(&other));
    }

    #[test]
    fn known_digest() {
        // sha256("abc")
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
