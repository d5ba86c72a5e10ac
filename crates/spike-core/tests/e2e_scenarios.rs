//! End-to-end scenarios threading the deframer, dispatcher, and request
//! coordinator together the way a real connection would, without any
//! Bluetooth involved.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use spike_core::env::TokioEnvironment;
use spike_core::{Deframer, Dispatcher, HubError, RequestCoordinator};
use spike_core::coordinator::FrameSink;
use spike_proto::messages::InfoResponse;
use spike_proto::{Message, framer};
use tokio::time::{advance, pause};

struct RecordingSink {
    sent: Arc<AtomicUsize>,
}

impl FrameSink for RecordingSink {
    async fn send(&self, _message: &Message) -> Result<(), HubError> {
        self.sent.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn dummy_info() -> InfoResponse {
    InfoResponse { rpc_major: 1, rpc_minor: 0, max_packet_size: 20, max_chunk_size: 512, raw: vec![0u8; 13] }
}

/// Scenario: a notification stream delivers the whole frame for an
/// `InfoResponse` split across two callback invocations. The deframer
/// should only hand the dispatcher a message once the delimiter byte
/// actually arrives, and the dispatcher should complete the matching
/// waiter rather than queue it.
#[tokio::test]
async fn info_response_split_across_callbacks_completes_the_waiter() {
    let dispatcher = Arc::new(Dispatcher::new());
    let mut deframer = Deframer::new();

    let payload = Message::InfoResponse(dummy_info()).encode();
    let frame = framer::pack(&payload);
    let (first, second) = frame.split_at(frame.len() - 1);

    let waiter = dispatcher.install_waiter(Message::InfoResponse(dummy_info()).id());

    assert!(deframer.feed(first).is_empty());
    for message in deframer.feed(second) {
        dispatcher.dispatch(message);
    }

    let resolved = waiter.await.unwrap();
    assert_eq!(resolved, Message::InfoResponse(dummy_info()));
    assert_eq!(dispatcher.inbox_len(), 0);
}

/// Scenario: two frames arrive coalesced in one notification. Both are
/// dispatched in order; the first (unmatched) goes to the inbox, the
/// second completes the installed waiter.
#[tokio::test]
async fn two_coalesced_frames_dispatch_in_arrival_order() {
    let dispatcher = Arc::new(Dispatcher::new());
    let mut deframer = Deframer::new();

    let mut combined = framer::pack(&Message::DeviceNotificationResponse.encode());
    combined.extend(framer::pack(&Message::InfoResponse(dummy_info()).encode()));

    let waiter = dispatcher.install_waiter(Message::InfoResponse(dummy_info()).id());
    let decoded = deframer.feed(&combined);
    assert_eq!(decoded.len(), 2);
    for message in decoded {
        dispatcher.dispatch(message);
    }

    assert_eq!(waiter.await.unwrap(), Message::InfoResponse(dummy_info()));
    assert_eq!(dispatcher.poll_inbox(), Some(Message::DeviceNotificationResponse));
}

/// Scenario: a malformed frame (a code byte promising more bytes than
/// follow before the delimiter) is dropped, and deframing continues to
/// recover a subsequent well-formed frame.
#[tokio::test]
async fn malformed_frame_is_skipped_and_a_later_frame_still_dispatches() {
    let dispatcher = Arc::new(Dispatcher::new());
    let mut deframer = Deframer::new();

    let mut stream = vec![0x05u8, framer::DELIMITER];
    stream.extend(framer::pack(&Message::InfoRequest.encode()));

    let decoded = deframer.feed(&stream);
    assert_eq!(decoded.len(), 1);
    dispatcher.dispatch(decoded.into_iter().next().unwrap());
    assert_eq!(dispatcher.poll_inbox(), Some(Message::InfoRequest));
}

/// Scenario: a request issued shortly before disconnect observes
/// `Cancelled`, never `Timeout` — the slot is cleared by disconnect, not
/// by the deadline elapsing.
#[tokio::test]
async fn disconnect_during_request_surfaces_cancelled_not_timeout() {
    pause();
    let dispatcher = Arc::new(Dispatcher::new());
    let coordinator = Arc::new(RequestCoordinator::new(dispatcher.clone(), TokioEnvironment));
    let sink = Arc::new(RecordingSink { sent: Arc::new(AtomicUsize::new(0)) });

    let task_coordinator = coordinator.clone();
    let task_sink = sink.clone();
    let handle = tokio::spawn(async move {
        task_coordinator
            .request(
                &*task_sink,
                Message::InfoRequest,
                Message::InfoResponse(dummy_info()).id(),
                Duration::from_secs(5),
            )
            .await
    });

    // Let the spawned request install its waiter and send, then simulate a
    // disconnect 100ms (virtual) later, well before the 5s deadline.
    tokio::task::yield_now().await;
    tokio::task::yield_now().await;
    advance(Duration::from_millis(100)).await;
    dispatcher.clear_waiter();

    let err = handle.await.unwrap().unwrap_err();
    assert!(matches!(err, HubError::Cancelled), "expected Cancelled, got {err:?}");
}
