#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Must never panic on arbitrary input
    if let Ok(result) = imphash::imphash_from_bytes(data) {
        assert_eq!(result.imp_hash.len(), 32);
    }
});
