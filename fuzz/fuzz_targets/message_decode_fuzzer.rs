//! Fuzz target for `Message::decode`.
//!
//! # Invariants
//!
//! - Decoding arbitrary bytes never panics; every rejection is a
//!   structured `ProtocolError`.
//! - Every successfully decoded message re-encodes to a payload whose
//!   leading byte is the same ID it was decoded from.

#![no_main]

use libfuzzer_sys::fuzz_target;
use spike_proto::Message;

fuzz_target!(|data: &[u8]| {
    if let Ok(message) = Message::decode(data) {
        let id = data[0];
        assert_eq!(message.id(), id);

        let re_encoded = message.encode();
        assert_eq!(re_encoded[0], id);
    }
});
