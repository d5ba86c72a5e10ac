//! Byte-stuffing framer: pack a payload into a self-delimiting frame, and
//! unpack a frame back into its payload.
//!
//! The wire format absorbs any byte `<= DELIMITER` into the code byte that
//! precedes a run of ordinary bytes, so a decoded payload may contain
//! arbitrary bytes (including `0x00`, `0x01`, and `0x02` itself) while the
//! encoded body never contains a bare `0x02` except as the final,
//! unambiguous frame terminator. Every run is capped at [`MAX_BLOCK`] bytes;
//! longer stretches of plain bytes are split across multiple code bytes.
//!
//! This is a from-scratch COBS-style codec, not a transcription of any
//! particular reference encoder; it is built to satisfy the round-trip and
//! block-boundary properties this protocol is tested against.

use crate::error::ProtocolError;

/// Byte that terminates every frame. Never appears elsewhere in a well-formed
/// encoded frame.
pub const DELIMITER: u8 = 0x02;

/// XORed across the encoded body (not the trailing delimiter) to keep the
/// wire form free of `0x02` outside of the terminator and to obscure runs of
/// zero bytes.
pub const XOR_MASK: u8 = 0x03;

/// Maximum number of literal (non-absorbed) bytes a single code byte can
/// introduce before the run is forcibly split.
pub const MAX_BLOCK: usize = 84;

/// Offset added to a run length before it is folded into a code byte.
pub const CODE_OFFSET: u8 = DELIMITER;

/// Sentinel code byte meaning "this run ends without absorbing a delimiter
/// -range byte" — either because it hit [`MAX_BLOCK`] literal bytes, or
/// because the payload ran out while the run was still open.
pub const NO_DELIM_CODE: u8 = 0xFF;

/// Packs `payload` into a frame: `[code byte, literal bytes, ...] ^ XOR_MASK`
/// followed by an unmasked [`DELIMITER`].
///
/// Round-trips for every byte sequence, including the empty sequence.
#[must_use]
pub fn pack(payload: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(payload.len() + payload.len() / MAX_BLOCK + 2);

    if payload.is_empty() {
        body.push(NO_DELIM_CODE);
    } else {
        let mut i = 0;
        while i < payload.len() {
            let start = i;
            let mut run_len = 0usize;
            while i < payload.len() && run_len < MAX_BLOCK && payload[i] > DELIMITER {
                run_len += 1;
                i += 1;
            }

            if i < payload.len() && payload[i] <= DELIMITER && run_len < MAX_BLOCK {
                let absorbed = payload[i];
                i += 1;
                let code = absorbed as usize * MAX_BLOCK + run_len;
                body.push(code as u8 + CODE_OFFSET);
                body.extend_from_slice(&payload[start..start + run_len]);
            } else {
                body.push(NO_DELIM_CODE);
                body.extend_from_slice(&payload[start..start + run_len]);
            }
        }
    }

    for b in &mut body {
        *b ^= XOR_MASK;
    }
    body.push(DELIMITER);
    body
}

/// Unpacks a frame produced by [`pack`] back into its payload.
///
/// # Errors
///
/// Returns [`ProtocolError::EmptyFrame`] for a frame with no code byte, and
/// [`ProtocolError::TruncatedBlock`] if a code byte claims more literal bytes
/// than remain in the frame. Both are recoverable: the caller drops the
/// frame and keeps deframing.
pub fn unpack(frame: &[u8]) -> Result<Vec<u8>, ProtocolError> {
    let masked = frame.strip_suffix(&[DELIMITER]).unwrap_or(frame);
    if masked.is_empty() {
        return Err(ProtocolError::EmptyFrame);
    }

    let stream: Vec<u8> = masked.iter().map(|b| b ^ XOR_MASK).collect();
    let mut payload = Vec::with_capacity(stream.len());
    let mut pos = 0usize;

    while pos < stream.len() {
        let code = stream[pos];
        pos += 1;

        if code == NO_DELIM_CODE {
            let take = (stream.len() - pos).min(MAX_BLOCK);
            payload.extend_from_slice(&stream[pos..pos + take]);
            pos += take;
            continue;
        }

        let value = (code - CODE_OFFSET) as usize;
        let absorbed = (value / MAX_BLOCK) as u8;
        let run_len = value % MAX_BLOCK;

        let available = stream.len() - pos;
        if available < run_len {
            return Err(ProtocolError::TruncatedBlock { expected: run_len, available });
        }
        payload.extend_from_slice(&stream[pos..pos + run_len]);
        pos += run_len;
        payload.push(absorbed);
    }

    Ok(payload)
}
