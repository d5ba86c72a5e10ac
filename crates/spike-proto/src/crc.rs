//! Streaming CRC-32 accumulator.
//!
//! Used both as a whole-file integrity token (seeded with 0, run once over
//! the entire upload) and as a running per-chunk progress token (each chunk
//! feeds the previous call's return value back in as `seed`).
//!
//! Every call pads its own input with zero bytes up to the next 4-byte
//! boundary before folding it into the checksum. This makes the accumulator
//! associative across any split whose first half is already 4-byte aligned:
//! `crc(A ++ B, seed) == crc(B, crc(A, seed))` whenever `A.len() % 4 == 0`,
//! since padding `A` alone is then a no-op and the table fold is a plain
//! left-to-right reduction regardless of where the call boundary falls.

const TABLE: [u32; 256] = build_table();

const fn build_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut c = i as u32;
        let mut k = 0;
        while k < 8 {
            c = if c & 1 != 0 { 0xEDB8_8320 ^ (c >> 1) } else { c >> 1 };
            k += 1;
        }
        table[i] = c;
        i += 1;
    }
    table
}

#[inline]
const fn step(state: u32, byte: u8) -> u32 {
    TABLE[((state ^ byte as u32) & 0xFF) as usize] ^ (state >> 8)
}

/// Folds `data` into the running checksum `seed`, zero-padding `data` up to
/// the next 4-byte boundary first.
///
/// `crc32(&[], seed) == seed` for any seed (the identity/seed law): an
/// already-aligned empty slice contributes no padding and no table steps.
#[must_use]
pub fn crc32(data: &[u8], seed: u32) -> u32 {
    let mut state = seed;
    for &b in data {
        state = step(state, b);
    }
    let padding = (4 - data.len() % 4) % 4;
    for _ in 0..padding {
        state = step(state, 0);
    }
    state
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn empty_input_is_seed_law() {
        assert_eq!(crc32(&[], 0), 0);
        assert_eq!(crc32(&[], 0xDEAD_BEEF), 0xDEAD_BEEF);
    }

    #[test]
    fn aligned_four_byte_input_has_no_padding_effect() {
        let data = [1u8, 2, 3, 4];
        let direct = crc32(&data, 0);
        let stepped = data.iter().fold(0u32, |s, &b| step(s, b));
        assert_eq!(direct, stepped);
    }

    proptest! {
        #[test]
        fn associative_over_aligned_split(
            a in proptest::collection::vec(any::<u8>(), 0..256),
            b in proptest::collection::vec(any::<u8>(), 0..256),
            seed in any::<u32>(),
        ) {
            // Pad `a` out to 4-byte alignment so the split point is itself aligned.
            let mut aligned_a = a.clone();
            while aligned_a.len() % 4 != 0 {
                aligned_a.push(0);
            }
            let mut whole = aligned_a.clone();
            whole.extend_from_slice(&b);

            let combined = crc32(&whole, seed);
            let staged = crc32(&b, crc32(&aligned_a, seed));
            prop_assert_eq!(combined, staged);
        }
    }
}
