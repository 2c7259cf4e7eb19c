//! Fuzz target: config slot decoder
//!
//! Feeds arbitrary bytes to `decode_slot` and, when the input happens to
//! carry a valid digest, checks that:
//! - sanitising the decoded record always yields a config that validates
//! - re-encoding that config decodes back to the same values
//!
//! cargo fuzz run fuzz_config_slot

#![no_main]

use libfuzzer_sys::fuzz_target;
use rofilter::adapters::config_store::{decode_slot, encode_slot};
use rofilter::config::FilterConfig;

fuzz_target!(|data: &[u8]| {
    // Also try the input as a JSON body behind a correct header, so the
    // fuzzer reaches the field sanitiser without forging SHA-256.
    let mut framed = 0u32.to_le_bytes().to_vec();
    framed.extend_from_slice(&hmac_digest(data));
    framed.extend_from_slice(data);

    for blob in [data, framed.as_slice()] {
        let Some((seq, raw)) = decode_slot(blob) else {
            continue;
        };

        let (cfg, repaired) = FilterConfig::sanitize(&raw);
        assert!(repaired <= 5);
        assert!(cfg.validate().is_ok(), "sanitised config must validate: {cfg:?}");

        let reencoded = encode_slot(seq, &cfg).expect("sanitised config must encode");
        let (seq2, raw2) = decode_slot(&reencoded).expect("re-encoded slot must decode");
        assert_eq!(seq, seq2);
        assert_eq!(FilterConfig::sanitize(&raw2), (cfg, 0));
    }
});

fn hmac_digest(data: &[u8]) -> [u8; 32] {
    hmac_sha256::Hash::hash(data)
}
