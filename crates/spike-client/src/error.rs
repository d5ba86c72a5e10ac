//! Transport-level errors and their conversion into [`HubError`].

use spike_core::HubError;
use thiserror::Error;

/// The error type every [`crate::SpikeHub`] operation returns.
///
/// An alias rather than a wrapper: every error this crate's facade can
/// surface is already one of [`HubError`]'s variants, with transport
/// failures ([`TransportError`]) folded in via `From`.
pub type ClientError = HubError;

/// Errors raised by the BLE GATT transport itself, before they are folded
/// into the coarser [`HubError`] the rest of the workspace deals in.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The underlying BLE stack reported a failure.
    #[error("bluetooth error: {0}")]
    Ble(#[from] btleplug::Error),

    /// No candidate device matched the configured address, service UUID,
    /// or name hints within the scan window.
    #[error("no matching device found")]
    NoDeviceFound,

    /// The GATT service was not present on the connected device.
    #[error("service not found on device")]
    ServiceNotFound,

    /// The resolved RX characteristic cannot be written to, or TX cannot
    /// be subscribed to.
    #[error("characteristic unusable: {0}")]
    CharacteristicUnusable(&'static str),
}

impl From<TransportError> for HubError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Ble(e) => Self::ConnectFailed(e.to_string()),
            TransportError::NoDeviceFound => Self::ConnectFailed("no device found".to_string()),
            TransportError::ServiceNotFound => Self::ServiceNotFound,
            TransportError::CharacteristicUnusable(which) => {
                Self::CharacteristicUnusable(which.to_string())
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_device_found_maps_to_connect_failed() {
        let err: HubError = TransportError::NoDeviceFound.into();
        assert!(matches!(err, HubError::ConnectFailed(_)));
    }

    #[test]
    fn service_not_found_maps_straight_through() {
        let err: HubError = TransportError::ServiceNotFound.into();
        assert_eq!(err, HubError::ServiceNotFound);
    }

    #[test]
    fn characteristic_unusable_preserves_which_one() {
        let err: HubError = TransportError::CharacteristicUnusable("rx not writable").into();
        assert_eq!(err, HubError::CharacteristicUnusable("rx not writable".to_string()));
    }
}
