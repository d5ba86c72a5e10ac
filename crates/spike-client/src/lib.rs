//! BLE GATT client for a SPIKE App 3 hub.
//!
//! Wires `spike-core`'s sans-IO deframer, dispatcher, request coordinator,
//! and upload orchestrator to a real `btleplug` connection. [`hub::SpikeHub`]
//! is the facade most callers want: connect, run a handful of typed
//! requests, upload a program, and read unsolicited notifications off an
//! inbox.
//!
//! Everything that talks to Bluetooth directly lives in [`transport`]; the
//! facade never touches `btleplug` types itself.

pub mod config;
pub mod error;
pub mod hub;
pub mod transport;

pub use config::HubConfig;
pub use error::ClientError;
pub use hub::SpikeHub;
