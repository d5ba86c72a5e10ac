//! Error types for framing and message decoding.

use thiserror::Error;

/// Errors raised while packing, unpacking, or decoding a frame.
///
/// Every variant here is recoverable by the caller: a malformed or unknown
/// frame is dropped and deframing resumes on the next delimiter, it never
/// tears down the connection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The encoded stream ended in the middle of a block.
    #[error("malformed frame: block of {expected} bytes truncated after {available}")]
    TruncatedBlock {
        /// Bytes the block's code byte promised.
        expected: usize,
        /// Bytes actually present before the stream ended.
        available: usize,
    },

    /// The frame contained only the trailing delimiter.
    #[error("malformed frame: empty frame")]
    EmptyFrame,

    /// The payload's leading ID byte has no registered decoder.
    #[error("unknown message id {0:#04x}")]
    UnknownMessageId(u8),

    /// A payload was shorter than its message type requires.
    #[error("message {id:#04x} payload too short: need {need} bytes, have {have}")]
    PayloadTooShort {
        /// The message ID being decoded.
        id: u8,
        /// Minimum body length required.
        need: usize,
        /// Body length actually present.
        have: usize,
    },
}
