//! Connection lifecycle state.
//!
//! The actual GATT work (scanning, resolving characteristics, subscribing,
//! writing) lives in `spike-client`'s transport; this enum is the shared
//! vocabulary both that transport and this crate's dispatcher/coordinator
//! use to agree on what's currently possible.
//!
//! ```text
//!   Disconnected --connect--> Discovering --> Resolving --> Subscribed
//!        ^                        |               |             |
//!        |                        `---- error -----+---- error --'
//!        `------------------------ disconnect -------------------'
//! ```

/// Where a connection attempt currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No GATT connection; nothing is happening.
    Disconnected,
    /// Scanning for a candidate device (by address, service UUID, or name
    /// hint).
    Discovering,
    /// A device was found and connected; resolving the service and its
    /// RX/TX characteristics.
    Resolving,
    /// RX and TX are resolved and TX notifications are subscribed. Requests
    /// may be sent.
    Subscribed,
}

impl ConnectionState {
    /// Whether a typed request may be sent while in this state.
    #[must_use]
    pub const fn accepts_requests(self) -> bool {
        matches!(self, Self::Subscribed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_subscribed_accepts_requests() {
        assert!(!ConnectionState::Disconnected.accepts_requests());
        assert!(!ConnectionState::Discovering.accepts_requests());
        assert!(!ConnectionState::Resolving.accepts_requests());
        assert!(ConnectionState::Subscribed.accepts_requests());
    }
}
