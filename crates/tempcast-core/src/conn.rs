//! Per-connection streaming-task controller.
//!
//! Consumes the ordered command stream for one connection and drives the
//! producer through its Idle/Streaming transitions, then performs the single
//! terminal cleanup: however the command loop ends - clean disconnect,
//! receive error, invariant violation - the live producer (if any) is shut
//! down and the registry entry removed, exactly once.

use std::sync::Arc;
use std::time::Duration;

use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::producer::{spawn_producer, DEFAULT_CADENCE};
use crate::protocol::Command;
use crate::registry::{ConnectionId, ConnectionRegistry, RegistryError};

/// Drive one connection until its inbound stream ends.
///
/// `inbound` yields the connection's text payloads in arrival order; the
/// stream ending means the peer disconnected or the transport failed, both
/// of which take the same teardown path. `outbound` carries push messages
/// to the transport; while streaming, the producer task is its only writer.
///
/// Returns `Err` only on an internal invariant violation. A broken
/// connection is not an error here - it is the normal way a connection ends.
pub async fn run_connection(
    registry: Arc<ConnectionRegistry>,
    id: ConnectionId,
    inbound: impl Stream<Item = String> + Unpin,
    outbound: mpsc::UnboundedSender<String>,
) -> Result<(), RegistryError> {
    run_connection_with_cadence(registry, id, inbound, outbound, DEFAULT_CADENCE).await
}

/// Same as [`run_connection`] with an explicit reading cadence, so tests can
/// drive the controller under a paused clock.
pub async fn run_connection_with_cadence(
    registry: Arc<ConnectionRegistry>,
    id: ConnectionId,
    mut inbound: impl Stream<Item = String> + Unpin,
    outbound: mpsc::UnboundedSender<String>,
    cadence: Duration,
) -> Result<(), RegistryError> {
    registry.register(id)?;
    info!(%id, "connection registered");

    let result = command_loop(&registry, id, &mut inbound, &outbound, cadence).await;

    // Single terminal cleanup path. Shutting the producer down before
    // unregistering joins the task, so when this function returns no
    // orphaned producer is still running anywhere.
    if let Some(producer) = registry.take_producer(id) {
        producer.shutdown().await;
    }
    registry.unregister(id);
    info!(%id, "connection closed");

    result
}

async fn command_loop(
    registry: &ConnectionRegistry,
    id: ConnectionId,
    inbound: &mut (impl Stream<Item = String> + Unpin),
    outbound: &mpsc::UnboundedSender<String>,
    cadence: Duration,
) -> Result<(), RegistryError> {
    while let Some(payload) = inbound.next().await {
        match Command::decode(&payload) {
            Command::Start => {
                // At most one producer per connection: a repeated start is
                // a no-op, never a second task.
                if registry.is_streaming(id) {
                    debug!(%id, "start while already streaming, ignoring");
                    continue;
                }
                let producer = spawn_producer(id, cadence, outbound.clone());
                registry.set_producer(id, producer)?;
                info!(%id, "streaming started");
            }
            Command::Stop => {
                // take_producer clears the registry before the task is
                // awaited, so a start arriving right after always sees an
                // idle entry.
                match registry.take_producer(id) {
                    Some(producer) => {
                        producer.shutdown().await;
                        info!(%id, "streaming stopped");
                    }
                    None => debug!(%id, "stop while idle, ignoring"),
                }
            }
            Command::Unknown => {
                debug!(%id, payload = %payload, "ignoring unrecognized command");
            }
        }
    }
    Ok(())
}
