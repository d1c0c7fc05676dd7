//! Producer task - pushes readings to one connection at a fixed cadence
//! until cancelled or the connection is gone.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace};

use crate::protocol::Reading;
use crate::registry::ConnectionId;

/// Default interval between consecutive readings.
pub const DEFAULT_CADENCE: Duration = Duration::from_secs(1);

/// Handle to a running producer task: the cancellation token plus the join
/// handle, so shutdown can both signal the task and wait it out.
#[derive(Debug)]
pub struct ProducerHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl ProducerHandle {
    /// Signal cancellation and wait for the task to finish.
    ///
    /// Cancellation is cooperative but prompt: the task selects on the token
    /// during its cadence wait, so this returns as soon as the current
    /// iteration's send (a non-blocking channel push) completes. Once this
    /// returns, the task is joined and can never send again.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(err) = self.task.await {
            if err.is_panic() {
                error!("producer task panicked: {err}");
            }
        }
    }

    /// Signal cancellation and detach without waiting. Only used on
    /// invariant-violation paths inside the registry, where no async context
    /// is available; normal teardown goes through [`Self::shutdown`].
    pub(crate) fn abort(self) {
        self.cancel.cancel();
        self.task.abort();
    }
}

/// Spawn the producer task for one connection.
///
/// The task loops: sample a reading, push it on `outbound`, wait one
/// cadence. It exits when cancelled, or quietly when `outbound` is closed -
/// the transport pump ending is how a send failure surfaces here, and the
/// controller independently observes the same disconnect on its inbound
/// side. Each push is serialized whole before it is sent, so a cancelled
/// task never leaves a partial message behind.
pub fn spawn_producer(
    id: ConnectionId,
    cadence: Duration,
    outbound: mpsc::UnboundedSender<String>,
) -> ProducerHandle {
    let cancel = CancellationToken::new();
    let token = cancel.clone();

    let task = tokio::spawn(async move {
        loop {
            let reading = Reading::sample();
            trace!(%id, value = reading.value, "pushing reading");
            if outbound.send(reading.to_push()).is_err() {
                debug!(%id, "outbound channel closed, producer stopping");
                break;
            }
            tokio::select! {
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(cadence) => {}
            }
        }
    });

    ProducerHandle { cancel, task }
}
