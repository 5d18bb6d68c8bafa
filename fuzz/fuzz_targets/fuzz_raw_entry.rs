#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Batch submissions arrive as loosely typed JSON objects.
    if let Ok(raw) = serde_json::from_slice::<dcns_node::RawEntry>(data) {
        if let Ok(entry) = raw.into_dns_entry() {
            assert!(entry.validate().is_ok());
        }
    }
});
