//! Routes a decoded message to a waiting typed request, or to the inbox.
//!
//! The dispatcher is the single consumer of [`crate::Deframer`]'s output. It
//! holds no lock of its own beyond a `std::sync::Mutex` around a small,
//! synchronous inbox (never held across an `await`); the actual waiting is
//! done by [`crate::RequestCoordinator`] via the [`tokio::sync::oneshot`]
//! handle installed into the slot.

use std::collections::VecDeque;
use std::sync::Mutex;

use spike_proto::Message;
use tokio::sync::oneshot;
use tracing::trace;

/// Default number of unsolicited messages retained before the oldest is
/// dropped to make room for a new one.
///
/// Resolves an open question left by the distilled specification (an
/// unbounded inbox risks an unattended consumer accumulating unsolicited
/// `DeviceNotification` traffic without bound): this workspace bounds the
/// inbox and drops the oldest entry on overflow rather than blocking the
/// notification callback path.
pub const DEFAULT_INBOX_CAPACITY: usize = 64;

struct Slot {
    expected_id: u8,
    completion: oneshot::Sender<Message>,
}

/// Routes decoded messages either to a single outstanding typed waiter or
/// to a bounded FIFO inbox.
pub struct Dispatcher {
    slot: Mutex<Option<Slot>>,
    inbox: Mutex<VecDeque<Message>>,
    capacity: usize,
}

impl Dispatcher {
    /// Creates a dispatcher with the default inbox capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_INBOX_CAPACITY)
    }

    /// Creates a dispatcher with a caller-chosen inbox capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self { slot: Mutex::new(None), inbox: Mutex::new(VecDeque::new()), capacity }
    }

    /// Installs a waiter expecting a message with ID `expected_id`.
    ///
    /// Returns the receiving half of the completion handle; the caller
    /// (the request coordinator) awaits it with its own timeout.
    pub fn install_waiter(&self, expected_id: u8) -> oneshot::Receiver<Message> {
        let (tx, rx) = oneshot::channel();
        let mut slot = self.slot.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        *slot = Some(Slot { expected_id, completion: tx });
        rx
    }

    /// Clears any installed waiter without completing it (used on timeout
    /// or cancellation, where the caller is no longer listening).
    pub fn clear_waiter(&self) {
        let mut slot = self.slot.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        *slot = None;
    }

    /// Drops every message currently queued in the inbox (used on
    /// disconnect, so unsolicited traffic from a previous connection never
    /// leaks into the next one).
    pub fn drain_inbox(&self) {
        let mut inbox = self.inbox.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        inbox.clear();
    }

    /// Routes one decoded message: completes the waiter if its ID matches,
    /// otherwise enqueues it into the inbox (dropping the oldest entry if
    /// the inbox is full).
    pub fn dispatch(&self, message: Message) {
        let mut slot = self.slot.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(waiting) = slot.take_if(|s| s.expected_id == message.id()) {
            // take_if leaves `slot` as None on match; send the match and return.
            let _ = waiting.completion.send(message);
            return;
        }
        drop(slot);

        let mut inbox = self.inbox.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if inbox.len() >= self.capacity {
            trace!("inbox full, dropping oldest message");
            inbox.pop_front();
        }
        inbox.push_back(message);
    }

    /// Pops the oldest unsolicited message, if any.
    pub fn poll_inbox(&self) -> Option<Message> {
        let mut inbox = self.inbox.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        inbox.pop_front()
    }

    /// Number of messages currently queued in the inbox.
    #[must_use]
    pub fn inbox_len(&self) -> usize {
        self.inbox.lock().unwrap_or_else(std::sync::PoisonError::into_inner).len()
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use spike_proto::messages::Message as M;

    use super::*;

    #[test]
    fn matching_message_completes_waiter_not_inbox() {
        let dispatcher = Dispatcher::new();
        let rx = dispatcher.install_waiter(M::InfoResponse(dummy_info()).id());
        dispatcher.dispatch(M::InfoResponse(dummy_info()));

        assert_eq!(dispatcher.inbox_len(), 0);
        assert_eq!(rx.try_recv().unwrap(), M::InfoResponse(dummy_info()));
    }

    #[test]
    fn mismatched_message_goes_to_inbox_and_waiter_stays_open() {
        let dispatcher = Dispatcher::new();
        let mut rx = dispatcher.install_waiter(M::InfoResponse(dummy_info()).id());
        dispatcher.dispatch(M::DeviceNotificationResponse);

        assert_eq!(dispatcher.inbox_len(), 1);
        assert!(rx.try_recv().is_err());
        assert_eq!(dispatcher.poll_inbox(), Some(M::DeviceNotificationResponse));
    }

    #[test]
    fn inbox_drops_oldest_when_full() {
        let dispatcher = Dispatcher::with_capacity(2);
        dispatcher.dispatch(M::DeviceNotification { body: vec![1] });
        dispatcher.dispatch(M::DeviceNotification { body: vec![2] });
        dispatcher.dispatch(M::DeviceNotification { body: vec![3] });

        assert_eq!(dispatcher.inbox_len(), 2);
        assert_eq!(dispatcher.poll_inbox(), Some(M::DeviceNotification { body: vec![2] }));
        assert_eq!(dispatcher.poll_inbox(), Some(M::DeviceNotification { body: vec![3] }));
    }

    #[test]
    fn drain_inbox_empties_queued_messages() {
        let dispatcher = Dispatcher::new();
        dispatcher.dispatch(M::DeviceNotification { body: vec![1] });
        dispatcher.dispatch(M::DeviceNotification { body: vec![2] });
        assert_eq!(dispatcher.inbox_len(), 2);

        dispatcher.drain_inbox();
        assert_eq!(dispatcher.inbox_len(), 0);
        assert_eq!(dispatcher.poll_inbox(), None);
    }

    fn dummy_info() -> spike_proto::messages::InfoResponse {
        spike_proto::messages::InfoResponse {
            rpc_major: 1,
            rpc_minor: 0,
            max_packet_size: 20,
            max_chunk_size: 512,
            raw: vec![0u8; 13],
        }
    }
}
