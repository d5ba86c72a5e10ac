//! Property-based tests for the framer and CRC accumulator.
//!
//! These exercise the wire-level guarantees across arbitrary inputs rather
//! than single examples: every payload round-trips through `pack`/`unpack`,
//! and the CRC accumulator is associative across any 4-byte-aligned split.

#![allow(clippy::unwrap_used)]

use proptest::prelude::*;
use spike_proto::{crc32, pack, unpack};

proptest! {
    #[test]
    fn pack_unpack_round_trip(payload in proptest::collection::vec(any::<u8>(), 0..4096)) {
        let frame = pack(&payload);
        prop_assert_eq!(unpack(&frame).unwrap(), payload);
    }

    #[test]
    fn packed_frame_has_single_trailing_delimiter(
        payload in proptest::collection::vec(any::<u8>(), 0..512)
    ) {
        let frame = pack(&payload);
        prop_assert_eq!(*frame.last().unwrap(), spike_proto::framer::DELIMITER);
        prop_assert!(!frame[..frame.len() - 1].contains(&spike_proto::framer::DELIMITER));
    }

    #[test]
    fn crc_over_whole_equals_staged_aligned_halves(
        head in proptest::collection::vec(any::<u8>(), 0..64),
        tail in proptest::collection::vec(any::<u8>(), 0..64),
    ) {
        let mut aligned_head = head.clone();
        while aligned_head.len() % 4 != 0 {
            aligned_head.push(0);
        }
        let mut whole = aligned_head.clone();
        whole.extend_from_slice(&tail);

        let direct = crc32(&whole, 0);
        let staged = crc32(&tail, crc32(&aligned_head, 0));
        prop_assert_eq!(direct, staged);
    }
}

#[test]
fn upload_chunk_sequence_running_crc_matches_prefix_crc() {
    let data = vec![0u8; 1024];
    let chunk_size = 256;
    let mut running = crc32(&[], 0);
    let mut offset = 0;
    let mut prefix_crcs = Vec::new();
    while offset < data.len() {
        let end = (offset + chunk_size).min(data.len());
        running = crc32(&data[offset..end], running);
        prefix_crcs.push(running);
        offset = end;
    }
    assert_eq!(prefix_crcs.len(), 4);
    assert_eq!(*prefix_crcs.last().unwrap(), crc32(&data, 0));
}
