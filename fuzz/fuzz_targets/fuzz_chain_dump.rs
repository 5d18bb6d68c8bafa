#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // A peer's chain dump is untrusted input: parsing, hashing and
    // validating it must never panic.
    if let Ok(dump) = serde_json::from_slice::<dcns_types::ChainDump>(data) {
        for block in &dump.chain {
            let _ = dcns_work::hash_block(block);
        }
        let _ = dcns_ledger::validate_dump(&dump);
    }
});
