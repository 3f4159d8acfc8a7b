#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(digest) = imphash::similarity::fuzzy_hash(data, 0) else {
        return;
    };
    assert_eq!(imphash::similarity::compare(&digest, &digest).ok(), Some(100));
    if let Ok(text) = std::str::from_utf8(data) {
        let _ = imphash::similarity::compare(text, &digest);
    }
});
