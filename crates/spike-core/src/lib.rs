//! Sans-IO protocol core for a SPIKE App 3 GATT client.
//!
//! Everything in this crate is transport-agnostic: it reasons about bytes
//! handed to it by a notification callback and about outbound frames it
//! hands back, never about Bluetooth itself. The concrete GATT transport
//! lives in `spike-client`, which wires this crate's [`Deframer`],
//! [`Dispatcher`], [`RequestCoordinator`], and [`UploadOrchestrator`] to a
//! real connection.

pub mod connection;
pub mod coordinator;
pub mod deframer;
pub mod dispatcher;
pub mod env;
pub mod error;
pub mod upload;

pub use connection::ConnectionState;
pub use coordinator::RequestCoordinator;
pub use deframer::Deframer;
pub use dispatcher::Dispatcher;
pub use env::Environment;
pub use error::HubError;
pub use upload::UploadOrchestrator;
