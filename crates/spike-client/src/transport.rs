//! BLE GATT transport: device discovery, service/characteristic
//! resolution, notification subscription, and chunked writes.
//!
//! Mirrors the shape of a typical async transport in this workspace's
//! lineage: a background task owns the live connection and notification
//! stream, forwarding decoded messages to the rest of the client over an
//! unbounded channel, while the handle returned to callers only exposes
//! `write_frame`/`disconnect`. The one rule specific to this protocol is
//! that the background task's per-notification work (buffer append,
//! delimiter scan, decode) never awaits — only the one-time setup
//! (scanning, connecting, subscribing) and the outbound write path do.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use btleplug::api::{Central, Characteristic, CharPropFlags, Peripheral as _, ScanFilter, WriteType};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::StreamExt;
use spike_core::Deframer;
use spike_proto::{Message, framer};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::HubConfig;
use crate::error::TransportError;

/// A live GATT connection plus the bookkeeping needed to write frames.
pub struct Transport {
    peripheral: Peripheral,
    rx_uuid: uuid::Uuid,
    tx_uuid: uuid::Uuid,
    write_type: WriteType,
    max_packet_size: AtomicUsize,
}

impl Transport {
    /// Scans for a device matching `config`, connects, resolves the
    /// service and RX/TX characteristics, and subscribes to TX
    /// notifications.
    ///
    /// Returns the transport handle plus the receiving half of a channel
    /// carrying every decoded message from the notification stream, in
    /// arrival order.
    pub async fn connect(
        config: &HubConfig,
    ) -> Result<(Self, mpsc::UnboundedReceiver<Message>), TransportError> {
        let manager = Manager::new().await?;
        let adapters = manager.adapters().await?;
        let adapter = adapters.into_iter().next().ok_or(TransportError::NoDeviceFound)?;

        let peripheral = find_device(&adapter, config).await?;
        peripheral.connect().await?;
        peripheral.discover_services().await?;

        let characteristics = peripheral.characteristics();
        let (rx, tx) = resolve_rx_tx(&characteristics, config)?;

        let write_type = if rx.properties.contains(CharPropFlags::WRITE) {
            WriteType::WithResponse
        } else if rx.properties.contains(CharPropFlags::WRITE_WITHOUT_RESPONSE) {
            WriteType::WithoutResponse
        } else {
            return Err(TransportError::CharacteristicUnusable("rx not writable"));
        };
        if !tx.properties.contains(CharPropFlags::NOTIFY) {
            return Err(TransportError::CharacteristicUnusable("tx not notifiable"));
        }

        peripheral.subscribe(&tx).await?;
        tokio::time::sleep(crate::config::SUBSCRIBE_SETTLE_DELAY).await;

        let (tx_sender, rx_receiver) = mpsc::unbounded_channel();
        spawn_notification_task(peripheral.clone(), tx_sender);

        Ok((
            Self {
                peripheral,
                rx_uuid: rx.uuid,
                tx_uuid: tx.uuid,
                write_type,
                max_packet_size: AtomicUsize::new(UNNEGOTIATED_PACKET_SIZE),
            },
            rx_receiver,
        ))
    }

    /// Overrides the chunking bound once the hub's InfoResponse has
    /// negotiated one. Before this is ever called, [`Transport::write_frame`]
    /// writes each frame as a single segment (spec: "if none cached, write
    /// the whole frame in one segment"), matching the reference client's
    /// `max_packet_size or len(frame)`.
    ///
    /// Takes `&self`, not `&mut self`: the facade holds this transport
    /// behind an `Arc` so a request in flight never has to block a
    /// concurrent disconnect, so nothing here can assume unique ownership.
    pub fn set_max_packet_size(&self, max_packet_size: usize) {
        self.max_packet_size.store(max_packet_size.max(1), Ordering::Relaxed);
    }

    /// Writes `frame` to RX, split into chunks of at most the negotiated
    /// packet size, in order. Until [`Transport::set_max_packet_size`] has
    /// been called at least once, the whole frame is written as a single
    /// segment rather than split at an assumed default.
    pub async fn write_frame(&self, frame: &[u8]) -> Result<(), TransportError> {
        let characteristics = self.peripheral.characteristics();
        let rx = characteristics
            .iter()
            .find(|c| c.uuid == self.rx_uuid)
            .ok_or(TransportError::ServiceNotFound)?;

        let negotiated = self.max_packet_size.load(Ordering::Relaxed);
        let chunk_size = if negotiated == UNNEGOTIATED_PACKET_SIZE { frame.len().max(1) } else { negotiated };
        for chunk in frame.chunks(chunk_size) {
            self.peripheral.write(rx, chunk, self.write_type).await?;
        }
        Ok(())
    }

    /// Unsubscribes from TX (best-effort) and disconnects.
    pub async fn disconnect(&self) -> Result<(), TransportError> {
        let characteristics = self.peripheral.characteristics();
        if let Some(tx) = characteristics.iter().find(|c| c.uuid == self.tx_uuid) {
            if let Err(err) = self.peripheral.unsubscribe(tx).await {
                warn!(%err, "unsubscribe failed during disconnect, continuing");
            }
        }
        self.peripheral.disconnect().await?;
        Ok(())
    }
}

/// Resolves the RX (writable) and TX (notify-capable) characteristics.
///
/// Tries the configured UUIDs first; if either misses, falls back to
/// scanning every discovered characteristic by property (first
/// notify-capable one as TX, first write-or-write-without-response one as
/// RX), the way the reference hub client does when a device exposes the
/// service under non-default UUIDs. RX and TX must resolve to distinct
/// characteristics either way.
fn resolve_rx_tx(
    characteristics: &std::collections::BTreeSet<Characteristic>,
    config: &HubConfig,
) -> Result<(Characteristic, Characteristic), TransportError> {
    let mut rx = characteristics.iter().find(|c| c.uuid == config.rx_uuid).cloned();
    let mut tx = characteristics.iter().find(|c| c.uuid == config.tx_uuid).cloned();

    if rx.is_none() || tx.is_none() {
        for c in characteristics {
            if tx.is_none() && c.properties.contains(CharPropFlags::NOTIFY) {
                tx = Some(c.clone());
            }
            if rx.is_none()
                && (c.properties.contains(CharPropFlags::WRITE)
                    || c.properties.contains(CharPropFlags::WRITE_WITHOUT_RESPONSE))
            {
                rx = Some(c.clone());
            }
        }
    }

    let (rx, tx) = (rx.ok_or(TransportError::ServiceNotFound)?, tx.ok_or(TransportError::ServiceNotFound)?);
    if rx.uuid == tx.uuid {
        return Err(TransportError::CharacteristicUnusable("rx and tx resolved to the same characteristic"));
    }
    Ok((rx, tx))
}

/// Sentinel `max_packet_size` value meaning "not yet negotiated": write the
/// whole frame as a single segment rather than assume a chunk size the hub
/// never advertised.
const UNNEGOTIATED_PACKET_SIZE: usize = 0;

async fn find_device(
    adapter: &Adapter,
    config: &HubConfig,
) -> Result<Peripheral, TransportError> {
    adapter.start_scan(ScanFilter::default()).await?;
    tokio::time::sleep(Duration::from_secs(2)).await;
    let candidates = adapter.peripherals().await?;
    adapter.stop_scan().await?;

    if let Some(address) = &config.address {
        for peripheral in &candidates {
            if peripheral.address().to_string().eq_ignore_ascii_case(address) {
                return Ok(peripheral.clone());
            }
        }
        return Err(TransportError::NoDeviceFound);
    }

    for peripheral in &candidates {
        if let Ok(Some(props)) = peripheral.properties().await {
            if props.services.contains(&config.service_uuid) {
                return Ok(peripheral.clone());
            }
        }
    }

    for peripheral in &candidates {
        if let Ok(Some(props)) = peripheral.properties().await {
            if let Some(name) = &props.local_name {
                if config.name_hints.iter().any(|hint| name.contains(hint.as_str())) {
                    return Ok(peripheral.clone());
                }
            }
        }
    }

    Err(TransportError::NoDeviceFound)
}

/// Owns the deframing buffer across the lifetime of one connection. Each
/// notification only appends bytes, scans for the delimiter, decodes, and
/// forwards — never awaits.
fn spawn_notification_task(peripheral: Peripheral, sender: mpsc::UnboundedSender<Message>) {
    tokio::spawn(async move {
        let mut deframer = Deframer::new();
        let Ok(mut notifications) = peripheral.notifications().await else {
            warn!("failed to subscribe to notification stream");
            return;
        };

        while let Some(event) = notifications.next().await {
            for message in deframer.feed(&event.value) {
                debug!(id = message.id(), "dispatching decoded message");
                if sender.send(message).is_err() {
                    info!("notification receiver dropped, ending notification task");
                    return;
                }
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unnegotiated_sentinel_never_collides_with_a_real_packet_size() {
        assert_eq!(UNNEGOTIATED_PACKET_SIZE, 0, "a real max_packet_size is always >= 1");
    }
}
