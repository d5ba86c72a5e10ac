//! High-level facade: connect once, then issue typed requests, run an
//! upload, or drain unsolicited notifications.
//!
//! Grounded on the original hub client's `Hub` class (`connect`,
//! `send_request`, `recv`, `get_info`, `enable_notifications`,
//! `upload_program`, `start_program`/`stop_program`) — here split across
//! `spike-core`'s sans-IO pieces and this crate's `Transport`, but keeping
//! the same method vocabulary callers already know.

use std::sync::Arc;
use std::time::Duration;

use spike_core::coordinator::FrameSink;
use spike_core::{ConnectionState, Dispatcher, HubError, RequestCoordinator, UploadOrchestrator};
use spike_proto::framer;
use spike_proto::messages::InfoResponse;
use spike_proto::{Message, crc32};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::HubConfig;
use crate::transport::Transport;

/// A connected (or not-yet-connected) SPIKE App 3 hub.
///
/// Cheaply constructed; [`SpikeHub::connect`] does the actual scanning,
/// GATT resolution, and subscription work described in the transport state
/// machine. Dropping a connected hub without calling [`SpikeHub::disconnect`]
/// leaves the underlying GATT connection open until the OS reclaims it —
/// callers should prefer an explicit disconnect.
pub struct SpikeHub {
    config: HubConfig,
    dispatcher: Arc<Dispatcher>,
    coordinator: RequestCoordinator<spike_core::env::TokioEnvironment>,
    inner: Mutex<Inner>,
    info: Mutex<Option<InfoResponse>>,
}

struct Inner {
    transport: Option<Arc<Transport>>,
    pump_task: Option<JoinHandle<()>>,
    state: ConnectionState,
}

/// Adapts [`Transport::write_frame`] to the [`FrameSink`] contract the
/// coordinator expects, so `spike-core` never needs to know about
/// `btleplug`.
///
/// Holds an owned `Arc`, not a borrow of [`Inner`]'s guard: [`SpikeHub::request`]
/// and [`SpikeHub::send`] clone this out from under `inner`'s lock and drop
/// the guard before awaiting, so a concurrent [`SpikeHub::disconnect`] can
/// still take the lock and cancel the waiter while a request is in flight
/// rather than blocking behind it until it times out.
struct TransportSink(Arc<Transport>);

impl FrameSink for TransportSink {
    async fn send(&self, message: &Message) -> Result<(), HubError> {
        let frame = framer::pack(&message.encode());
        self.0.write_frame(&frame).await.map_err(HubError::from)
    }
}

impl SpikeHub {
    /// Creates a hub with the given configuration. No I/O happens until
    /// [`SpikeHub::connect`] is called.
    #[must_use]
    pub fn new(config: HubConfig) -> Self {
        let dispatcher = Arc::new(Dispatcher::new());
        let coordinator =
            RequestCoordinator::new(dispatcher.clone(), spike_core::env::TokioEnvironment);
        Self {
            config,
            dispatcher,
            coordinator,
            inner: Mutex::new(Inner { transport: None, pump_task: None, state: ConnectionState::Disconnected }),
            info: Mutex::new(None),
        }
    }

    /// Scans for a device, connects, resolves the service and RX/TX
    /// characteristics, and subscribes to notifications.
    ///
    /// On success, spawns a background task that drains decoded
    /// notifications into the dispatcher for the lifetime of the
    /// connection; callers never need to pump it themselves.
    pub async fn connect(&self) -> Result<(), HubError> {
        let mut inner = self.inner.lock().await;
        inner.state = ConnectionState::Discovering;

        let connected = tokio::time::timeout(self.config.connect_timeout, Transport::connect(&self.config)).await;
        let (transport, mut notifications) = match connected {
            Ok(result) => result.map_err(|err| {
                inner.state = ConnectionState::Disconnected;
                HubError::from(err)
            })?,
            Err(_) => {
                inner.state = ConnectionState::Disconnected;
                return Err(HubError::ConnectFailed(format!(
                    "timed out after {:?}",
                    self.config.connect_timeout
                )));
            },
        };

        let dispatcher = self.dispatcher.clone();
        let pump_task = tokio::spawn(async move {
            while let Some(message) = notifications.recv().await {
                dispatcher.dispatch(message);
            }
        });

        inner.state = ConnectionState::Subscribed;
        inner.transport = Some(Arc::new(transport));
        inner.pump_task = Some(pump_task);
        Ok(())
    }

    /// Unsubscribes from notifications (best-effort), closes the GATT
    /// connection, stops the notification pump, clears cached negotiated
    /// sizes, cancels any pending request, and drains the inbox so
    /// unsolicited messages from this session never leak into the next.
    /// Idempotent: disconnecting an already-disconnected hub never errors.
    pub async fn disconnect(&self) {
        let mut inner = self.inner.lock().await;
        if let Some(transport) = inner.transport.take() {
            if let Err(err) = transport.disconnect().await {
                warn!(%err, "disconnect reported an error, continuing");
            }
        }
        if let Some(pump_task) = inner.pump_task.take() {
            pump_task.abort();
        }
        inner.state = ConnectionState::Disconnected;
        self.dispatcher.clear_waiter();
        self.dispatcher.drain_inbox();
        *self.info.lock().await = None;
    }

    /// Current connection lifecycle state.
    pub async fn state(&self) -> ConnectionState {
        self.inner.lock().await.state
    }

    /// Sends `message` with no response expected.
    pub async fn send(&self, message: Message) -> Result<(), HubError> {
        let sink = TransportSink(self.live_transport().await?);
        self.coordinator.send(&sink, message).await
    }

    /// Sends `message` and awaits a response whose ID matches
    /// `expected_response_id`, within `timeout`.
    ///
    /// The transport handle is cloned out from under `inner`'s lock before
    /// the wait begins, so a concurrent [`SpikeHub::disconnect`] is never
    /// blocked behind an in-flight request — it cancels the waiter instead
    /// of waiting for it to time out.
    pub async fn request(
        &self,
        message: Message,
        expected_response_id: u8,
        timeout: Duration,
    ) -> Result<Message, HubError> {
        let sink = TransportSink(self.live_transport().await?);
        self.coordinator.request(&sink, message, expected_response_id, timeout).await
    }

    /// Returns a clone of the live transport handle if connected, without
    /// holding `inner`'s lock beyond this call.
    async fn live_transport(&self) -> Result<Arc<Transport>, HubError> {
        let inner = self.inner.lock().await;
        if !inner.state.accepts_requests() {
            return Err(HubError::NotConnected);
        }
        inner.transport.clone().ok_or(HubError::NotConnected)
    }

    /// Pops the oldest unsolicited message from the inbox. Returns
    /// immediately with `None` if the inbox is empty; the background pump
    /// task spawned by [`SpikeHub::connect`] keeps it filled.
    #[must_use]
    pub fn try_recv(&self) -> Option<Message> {
        self.dispatcher.poll_inbox()
    }

    /// Requests the hub's RPC version and negotiated sizing, caching the
    /// result and updating the transport's write chunk size.
    pub async fn get_info(&self) -> Result<InfoResponse, HubError> {
        let reply = self
            .request(Message::InfoRequest, Message::InfoResponse(blank_info()).id(), self.config.request_timeout)
            .await?;
        let Message::InfoResponse(info) = reply else {
            return Err(HubError::HubFailure("unexpected response to InfoRequest".to_string()));
        };

        if let Some(transport) = self.inner.lock().await.transport.clone() {
            transport.set_max_packet_size(info.max_packet_size as usize);
        }
        *self.info.lock().await = Some(info.clone());
        Ok(info)
    }

    /// Enables (or disables, by passing `0`) periodic unsolicited
    /// `DeviceNotification` telemetry.
    pub async fn enable_notifications(&self, period_ms: u16) -> Result<(), HubError> {
        self.request(
            Message::DeviceNotificationRequest { period_ms },
            Message::DeviceNotificationResponse.id(),
            self.config.request_timeout,
        )
        .await?;
        Ok(())
    }

    /// Clears (erases) a program slot.
    pub async fn clear_slot(&self, slot: u8) -> Result<(), HubError> {
        let reply = self
            .request(
                Message::ClearSlotRequest { slot },
                Message::ClearSlotResponse { ok: true }.id(),
                self.config.request_timeout,
            )
            .await?;
        expect_ok(&reply)
    }

    /// Starts the program in `slot`.
    pub async fn start_program(&self, slot: u8) -> Result<(), HubError> {
        self.program_flow(false, slot).await
    }

    /// Stops the program running in `slot`, if any.
    pub async fn stop_program(&self, slot: u8) -> Result<(), HubError> {
        self.program_flow(true, slot).await
    }

    async fn program_flow(&self, stop: bool, slot: u8) -> Result<(), HubError> {
        let reply = self
            .request(
                Message::ProgramFlowRequest { stop, slot },
                Message::ProgramFlowResponse { ok: true }.id(),
                self.config.request_timeout,
            )
            .await?;
        expect_ok(&reply)
    }

    /// Clears `slot`, then uploads `data` under `name` and starts it —
    /// the common "replace and run" sequence from the original client's
    /// `run()` helper (clear-slot, upload, start, in that order).
    pub async fn deploy(&self, name: &str, slot: u8, data: &[u8]) -> Result<(), HubError> {
        self.clear_slot(slot).await?;
        self.upload_program(name, slot, data).await
    }

    /// Uploads `data` into `slot` under `name`, then starts the program.
    /// Fetches and caches [`InfoResponse`] first if it hasn't been already.
    pub async fn upload_program(&self, name: &str, slot: u8, data: &[u8]) -> Result<(), HubError> {
        let max_chunk_size = match self.info.lock().await.clone() {
            Some(info) => info.max_chunk_size,
            None => self.get_info().await?.max_chunk_size,
        };

        info!(name, slot, len = data.len(), max_chunk_size, "starting program upload");
        let orchestrator = UploadOrchestrator::new(&self.coordinator);
        let sink = TransportSink(self.live_transport().await?);
        orchestrator.upload(&sink, name, slot, data, max_chunk_size as usize).await
    }
}

fn blank_info() -> InfoResponse {
    InfoResponse { rpc_major: 0, rpc_minor: 0, max_packet_size: 0, max_chunk_size: 0, raw: Vec::new() }
}

fn expect_ok(message: &Message) -> Result<(), HubError> {
    let ok = match message {
        Message::ClearSlotResponse { ok }
        | Message::ProgramFlowResponse { ok } => *ok,
        _ => false,
    };
    if ok { Ok(()) } else { Err(HubError::HubFailure("hub rejected the request".to_string())) }
}

/// Computes the whole-file CRC-32 the way [`SpikeHub::upload_program`] does
/// internally, for callers that want to verify a payload before sending it.
#[must_use]
pub fn whole_file_crc(data: &[u8]) -> u32 {
    crc32(data, 0)
}
