//! Error types surfaced to callers of the protocol core.
//!
//! Framing and decoding errors ([`spike_proto::ProtocolError`]) never reach
//! this layer as-is: the deframer recovers from them locally and they only
//! show up here as `tracing` events. Everything in [`HubError`] is what
//! survives to the caller of a high-level operation.

use std::time::Duration;

use thiserror::Error;

/// Errors a consumer of this crate's coordinator, dispatcher, or upload
/// orchestrator may observe.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HubError {
    /// Operation attempted with no active connection.
    #[error("not connected")]
    NotConnected,

    /// Device discovery found no candidate, or opening the GATT connection
    /// failed.
    #[error("connect failed: {0}")]
    ConnectFailed(String),

    /// The required service, or its RX/TX characteristics, were not found.
    #[error("service not found")]
    ServiceNotFound,

    /// RX is not writable, or TX is not notifiable.
    #[error("characteristic unusable: {0}")]
    CharacteristicUnusable(String),

    /// A typed request is already outstanding; at most one may be in
    /// flight at a time.
    #[error("busy: a request is already outstanding")]
    Busy,

    /// The waiter exceeded its deadline.
    #[error("timed out after {elapsed:?}")]
    Timeout {
        /// How long the coordinator waited before giving up.
        elapsed: Duration,
    },

    /// Disconnect (or an explicit cancel) resolved the waiter before a
    /// response arrived.
    #[error("cancelled")]
    Cancelled,

    /// The hub's response body indicated a failure (bad CRC, unknown slot,
    /// and so on).
    #[error("hub reported failure: {0}")]
    HubFailure(String),
}

impl HubError {
    /// Returns true if retrying the same operation might succeed.
    ///
    /// A `Busy` error is transient by construction (the slot clears as soon
    /// as the outstanding request resolves); `Timeout` often is too. Every
    /// other variant reflects a connection or protocol state that retrying
    /// the same call will not fix on its own.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Busy | Self::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn busy_and_timeout_are_transient() {
        assert!(HubError::Busy.is_transient());
        assert!(HubError::Timeout { elapsed: Duration::from_secs(5) }.is_transient());
    }

    #[test]
    fn connection_and_protocol_errors_are_not_transient() {
        assert!(!HubError::NotConnected.is_transient());
        assert!(!HubError::ServiceNotFound.is_transient());
        assert!(!HubError::Cancelled.is_transient());
        assert!(!HubError::HubFailure("bad crc".to_string()).is_transient());
    }
}
