//! Serializes outbound traffic and correlates one outstanding typed request
//! with its response.
//!
//! The protocol has no request-id field; the only way to correlate a
//! response with its request is the response's message ID. Two concurrent
//! typed requests whose responses share an ID would be indistinguishable,
//! so at most one may be outstanding at a time. A `tokio::sync::Mutex` is
//! held across the `await` for the duration of one `request()` call by
//! design: this is the one place in the workspace where holding a lock
//! across an await is correct rather than a deadlock risk, since the lock
//! exists specifically to serialize whole requests, not just a critical
//! section within one.

use std::future::Future;
use std::time::Duration;

use spike_proto::Message;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::dispatcher::Dispatcher;
use crate::env::Environment;
use crate::error::HubError;

/// A function that writes a frame for `message` to the transport. Wrapped
/// behind a trait object so the coordinator stays transport-agnostic.
pub trait FrameSink: Send + Sync {
    /// Serializes, packs, and writes `message`, chunked to the transport's
    /// negotiated packet size.
    fn send(&self, message: &Message) -> impl Future<Output = Result<(), HubError>> + Send;
}

/// Serializes typed requests against a shared [`Dispatcher`] slot.
pub struct RequestCoordinator<E: Environment> {
    dispatcher: std::sync::Arc<Dispatcher>,
    lock: Mutex<()>,
    env: E,
}

impl<E: Environment> RequestCoordinator<E> {
    /// Creates a coordinator over the given dispatcher.
    pub fn new(dispatcher: std::sync::Arc<Dispatcher>, env: E) -> Self {
        Self { dispatcher, lock: Mutex::new(()), env }
    }

    /// Sends `message` with no response expected, without acquiring the
    /// request slot.
    pub async fn send<S: FrameSink>(&self, sink: &S, message: Message) -> Result<(), HubError> {
        sink.send(&message).await
    }

    /// Sends `message` and awaits a response whose ID equals
    /// `expected_response_id`, failing with [`HubError::Busy`] if another
    /// request is already outstanding and with [`HubError::Timeout`] if
    /// `timeout` elapses first.
    pub async fn request<S: FrameSink>(
        &self,
        sink: &S,
        message: Message,
        expected_response_id: u8,
        timeout: Duration,
    ) -> Result<Message, HubError> {
        let _guard = self.lock.try_lock().map_err(|_| HubError::Busy)?;

        let rx = self.dispatcher.install_waiter(expected_response_id);
        sink.send(&message).await.map_err(|err| {
            self.dispatcher.clear_waiter();
            err
        })?;

        let sleep = self.env.sleep(timeout);
        tokio::select! {
            biased;
            result = rx => result.map_err(|_| {
                warn!("request cancelled before a response arrived");
                HubError::Cancelled
            }),
            () = sleep => {
                self.dispatcher.clear_waiter();
                info!(?timeout, "request timed out");
                Err(HubError::Timeout { elapsed: timeout })
            },
        }
    }
}
