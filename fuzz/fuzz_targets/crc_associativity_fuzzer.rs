//! Fuzz target for streaming CRC-32 associativity.
//!
//! # Invariants
//!
//! - `crc32` never panics on arbitrary input of any length.
//! - Staging a buffer through two calls, seeding the second with the
//!   first's result, equals one call over the whole buffer whenever the
//!   split point is 4-byte aligned (the property the upload orchestrator
//!   depends on for its running chunk CRC).

#![no_main]

use libfuzzer_sys::fuzz_target;
use spike_proto::crc32;

fuzz_target!(|data: &[u8]| {
    let aligned_split = (data.len() / 4) * 4;
    let (first, second) = data.split_at(aligned_split);
    let staged = crc32(second, crc32(first, 0));
    assert_eq!(staged, crc32(data, 0));
});
