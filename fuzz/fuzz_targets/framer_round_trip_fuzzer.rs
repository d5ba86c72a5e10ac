//! Fuzz target for the COBS-variant framer.
//!
//! # Invariants
//!
//! - `unpack` never panics on arbitrary bytes; every failure is a
//!   structured `ProtocolError`.
//! - A frame produced by `pack` always round-trips through `unpack` back
//!   to the exact input payload.
//! - A packed frame contains the delimiter byte exactly once, as its last
//!   byte.

#![no_main]

use libfuzzer_sys::fuzz_target;
use spike_proto::framer::{self, DELIMITER};

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes as a "received frame": must never panic.
    let _ = framer::unpack(data);

    // Arbitrary bytes as a payload to pack: must round-trip exactly.
    let frame = framer::pack(data);
    assert_eq!(frame.iter().filter(|&&b| b == DELIMITER).count(), 1);
    assert_eq!(frame.last(), Some(&DELIMITER));

    match framer::unpack(&frame) {
        Ok(unpacked) => assert_eq!(unpacked, data),
        Err(err) => panic!("pack output failed to unpack: {err:?}"),
    }
});
