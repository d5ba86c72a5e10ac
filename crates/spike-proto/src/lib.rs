//! Wire framing and message types for the SPIKE App 3 GATT protocol.
//!
//! Every message exchanged with the hub travels as one self-delimiting frame
//! over a single GATT notify/write characteristic pair. This crate owns the
//! three pieces that never need a live connection to reason about: the
//! byte-stuffing framer ([`framer`]), the streaming CRC-32 accumulator
//! ([`crc`]), and the message registry mapping an ID byte to a concrete,
//! typed payload ([`messages`]).
//!
//! Nothing here touches Bluetooth. A frame is just bytes in, bytes out.

pub mod crc;
pub mod error;
pub mod framer;
pub mod messages;

pub use crc::crc32;
pub use error::ProtocolError;
pub use framer::{pack, unpack};
pub use messages::Message;
