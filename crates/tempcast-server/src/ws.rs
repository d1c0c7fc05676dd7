//! WebSocket transport adapter - bridges axum sockets onto the core
//! controller's stream/channel contract.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures::stream::SplitStream;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use tempcast_core::{run_connection, ConnectionRegistry};

pub async fn ws_handler(
    State(registry): State<Arc<ConnectionRegistry>>,
    upgrade: WebSocketUpgrade,
) -> Response {
    upgrade.on_upgrade(move |socket| handle_socket(registry, socket))
}

/// Run one connection to completion. Nothing escapes to the server loop: a
/// broken connection is logged and forgotten, and only an internal invariant
/// violation is worth an error-level entry.
async fn handle_socket(registry: Arc<ConnectionRegistry>, socket: WebSocket) {
    let id = registry.issue_id();
    info!(%id, "websocket connected");

    let (mut sink, stream) = socket.split();

    // The producer is the only writer while streaming, but it writes into
    // this channel rather than the socket; the pump keeps the sink single-
    // threaded and turns a dead socket into a closed channel the producer
    // notices on its next send.
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
    let pump = tokio::spawn(async move {
        while let Some(text) = out_rx.recv().await {
            if let Err(err) = sink.send(Message::Text(text)).await {
                debug!("websocket send failed: {err}");
                break;
            }
        }
    });

    let inbound = commands(stream);
    futures::pin_mut!(inbound);

    if let Err(err) = run_connection(registry, id, inbound, out_tx).await {
        error!(%id, "connection handler invariant violation: {err}");
    }

    pump.abort();
    info!(%id, "websocket finished");
}

/// Fold the socket's receive side into the text payloads the controller
/// consumes. Binary/ping/pong frames are transport chatter and skipped; a
/// close frame, end of stream, or receive error all end the stream, which
/// the controller treats as the one disconnect transition.
fn commands(stream: SplitStream<WebSocket>) -> impl futures::Stream<Item = String> {
    futures::stream::unfold(stream, |mut stream| async move {
        loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => return Some((text, stream)),
                Some(Ok(Message::Close(_))) | None => return None,
                Some(Ok(_)) => continue,
                Some(Err(err)) => {
                    debug!("websocket receive failed: {err}");
                    return None;
                }
            }
        }
    })
}
