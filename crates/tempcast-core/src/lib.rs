//! tempcast core - per-connection streaming-task lifecycle management
//!
//! Each client holds one duplex connection and toggles a recurring stream of
//! synthetic temperature readings on and off with `start`/`stop` commands.
//! This crate owns the hard part: starting, tracking, and cancelling the
//! producer task bound to each connection, keeping state consistent under
//! rapid toggling, and releasing everything deterministically when the
//! connection drops.
//!
//! The transport is abstracted away: the controller consumes an ordered
//! stream of inbound text payloads and writes pushes to an outbound channel,
//! so the whole state machine is testable without a socket.

pub mod conn;
pub mod producer;
pub mod protocol;
pub mod registry;

pub use conn::{run_connection, run_connection_with_cadence};
pub use producer::{spawn_producer, ProducerHandle, DEFAULT_CADENCE};
pub use protocol::{Command, Reading};
pub use registry::{ConnectionId, ConnectionRegistry, RegistryError};
