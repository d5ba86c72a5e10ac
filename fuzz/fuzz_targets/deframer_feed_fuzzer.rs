//! Fuzz target for `Deframer::feed` fed arbitrary, possibly-split byte
//! chunks, the way a real notification stream would deliver them.
//!
//! # Invariants
//!
//! - Feeding arbitrary bytes, in arbitrary chunk splits, never panics.
//! - After a `reset`, a well-formed frame always decodes regardless of
//!   whatever was fed beforehand (reset fully clears the buffer).

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use spike_proto::{Message, framer};
use spike_core::Deframer;

#[derive(Debug, Arbitrary)]
struct Chunks(Vec<Vec<u8>>);

fuzz_target!(|chunks: Chunks| {
    let mut deframer = Deframer::new();
    for chunk in &chunks.0 {
        let _ = deframer.feed(chunk);
    }

    deframer.reset();
    let good = framer::pack(&Message::InfoRequest.encode());
    let decoded = deframer.feed(&good);
    assert!(decoded.iter().any(|m| *m == Message::InfoRequest));
});
