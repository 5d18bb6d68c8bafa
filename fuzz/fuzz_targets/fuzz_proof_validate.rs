#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Proof checks run on every block of every peer chain.
    if data.len() >= 16 {
        let last_proof = u64::from_le_bytes([
            data[0], data[1], data[2], data[3], data[4], data[5], data[6], data[7],
        ]);
        let proof = u64::from_le_bytes([
            data[8], data[9], data[10], data[11], data[12], data[13], data[14], data[15],
        ]);
        let valid = dcns_work::valid_proof(last_proof, proof);
        assert_eq!(valid, dcns_work::check_proof(last_proof, proof).is_ok());
    }
});
