//! Accumulates notification bytes and splits them into decoded messages.
//!
//! A [`Deframer`] is owned exclusively by the notification callback path.
//! It never awaits and never touches any lock the [`crate::RequestCoordinator`]
//! holds; it only appends bytes, scans for [`spike_proto::framer::DELIMITER`],
//! and hands each decoded message to a sink closure.

use spike_proto::{Message, framer};
use tracing::{debug, trace};

/// Byte accumulator that turns a stream of notification payloads into
/// decoded [`Message`] values.
#[derive(Debug, Default)]
pub struct Deframer {
    buffer: Vec<u8>,
}

impl Deframer {
    /// Creates an empty deframer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends freshly received bytes and decodes every complete frame now
    /// present in the buffer, in arrival order.
    ///
    /// A malformed frame or an unknown message ID is dropped and logged;
    /// neither is fatal to the buffer's remaining contents.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Message> {
        self.buffer.extend_from_slice(bytes);
        let mut decoded = Vec::new();

        while let Some(end) = self.buffer.iter().position(|&b| b == framer::DELIMITER) {
            let frame: Vec<u8> = self.buffer.drain(..=end).collect();
            match framer::unpack(&frame) {
                Ok(payload) => match Message::decode(&payload) {
                    Ok(msg) => {
                        trace!(id = msg.id(), "decoded message");
                        decoded.push(msg);
                    },
                    Err(err) => debug!(%err, "dropping frame with unrecognized message"),
                },
                Err(err) => debug!(%err, "dropping malformed frame"),
            }
        }

        decoded
    }

    /// Clears the buffer (called on disconnect).
    pub fn reset(&mut self) {
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use spike_proto::{Message, framer};

    use super::*;

    #[test]
    fn split_across_two_notifications_yields_one_message() {
        let mut deframer = Deframer::new();
        let frame = framer::pack(&Message::InfoRequest.encode());
        let (first, second) = frame.split_at(frame.len() - 1);

        assert!(deframer.feed(first).is_empty());
        let decoded = deframer.feed(second);
        assert_eq!(decoded, vec![Message::InfoRequest]);
    }

    #[test]
    fn two_frames_coalesced_in_one_notification_decode_in_order() {
        let mut deframer = Deframer::new();
        let mut combined = framer::pack(&Message::InfoRequest.encode());
        combined.extend(framer::pack(&Message::DeviceNotificationResponse.encode()));

        let decoded = deframer.feed(&combined);
        assert_eq!(decoded, vec![Message::InfoRequest, Message::DeviceNotificationResponse]);
    }

    #[test]
    fn malformed_frame_is_dropped_and_deframer_recovers() {
        let mut deframer = Deframer::new();
        let mut stream = vec![0x05u8, framer::DELIMITER]; // truncated block, malformed
        stream.extend(framer::pack(&Message::InfoRequest.encode()));

        let decoded = deframer.feed(&stream);
        assert_eq!(decoded, vec![Message::InfoRequest]);
    }

    #[test]
    fn unknown_message_id_is_dropped() {
        let mut deframer = Deframer::new();
        let frame = framer::pack(&[0xEE]);
        assert!(deframer.feed(&frame).is_empty());
    }

    #[test]
    fn reset_clears_partial_buffer() {
        let mut deframer = Deframer::new();
        let frame = framer::pack(&Message::InfoRequest.encode());
        let (first, _second) = frame.split_at(frame.len() - 1);
        deframer.feed(first);
        deframer.reset();
        assert!(deframer.buffer.is_empty());
    }
}
