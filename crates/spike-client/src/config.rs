//! Connection configuration: device selection, GATT identifiers, and
//! timeouts.

use std::time::Duration;

use uuid::{Uuid, uuid};

/// SPIKE App 3's GATT service UUID.
pub const SERVICE_UUID: Uuid = uuid!("0000fd02-0000-1000-8000-00805f9b34fb");
/// Write characteristic (host -> hub).
pub const RX_CHARACTERISTIC_UUID: Uuid = uuid!("0000fd02-0001-1000-8000-00805f9b34fb");
/// Notify characteristic (hub -> host).
pub const TX_CHARACTERISTIC_UUID: Uuid = uuid!("0000fd02-0002-1000-8000-00805f9b34fb");

/// Name substrings a SPIKE App 3 hub's advertisement is known to carry.
///
/// Used as a fallback device-selection strategy when neither an explicit
/// address nor the advertised service UUID narrows the scan to one
/// candidate.
pub const DEFAULT_NAME_HINTS: &[&str] = &["SPIKE", "Spike", "Prime", "Hub", "Lego"];

/// Delay observed between subscribing to notifications and the first write
/// succeeding reliably; the peer needs time to commit the CCCD write.
pub const SUBSCRIBE_SETTLE_DELAY: Duration = Duration::from_millis(300);

/// Connection parameters for a [`crate::hub::SpikeHub`].
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Explicit hardware address to connect to, bypassing the scan
    /// entirely when set.
    pub address: Option<String>,
    /// Case-sensitive substrings matched against a candidate's advertised
    /// local name when no address or matching service UUID narrows the
    /// scan.
    pub name_hints: Vec<String>,
    /// GATT service UUID to scan for and resolve.
    pub service_uuid: Uuid,
    /// Write characteristic UUID.
    pub rx_uuid: Uuid,
    /// Notify characteristic UUID.
    pub tx_uuid: Uuid,
    /// Maximum time to spend scanning and connecting before giving up.
    pub connect_timeout: Duration,
    /// Default timeout applied to a typed request when the caller does not
    /// override it.
    pub request_timeout: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            address: None,
            name_hints: DEFAULT_NAME_HINTS.iter().map(|s| (*s).to_string()).collect(),
            service_uuid: SERVICE_UUID,
            rx_uuid: RX_CHARACTERISTIC_UUID,
            tx_uuid: TX_CHARACTERISTIC_UUID,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(5),
        }
    }
}

impl HubConfig {
    /// Connects to a specific device address, skipping hint-based
    /// discovery.
    #[must_use]
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Replaces the default name-hint list.
    #[must_use]
    pub fn with_name_hints(mut self, hints: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.name_hints = hints.into_iter().map(Into::into).collect();
        self
    }
}
