//! Connection registry - which connections exist, and whether a producer
//! task is currently streaming for each.
//!
//! The registry is explicit owned state, created once at server start and
//! injected into every connection handler. Keys come and go concurrently as
//! connections are accepted and dropped; each entry's value is mutated only
//! by the controller that owns that connection, so the map is the single
//! source of truth for "is a producer associated with this connection".

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::error;

use crate::producer::ProducerHandle;

/// Stable identity for one accepted connection. Issued from a per-registry
/// counter and never reused within a process run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Internal invariant violations. These indicate a controller bug, not a
/// client-facing condition: fatal to the one connection's handler, never to
/// the process.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("{0} is already registered")]
    AlreadyRegistered(ConnectionId),

    #[error("{0} is not registered")]
    NotRegistered(ConnectionId),

    #[error("{0} already has an active producer")]
    ProducerAlreadyActive(ConnectionId),
}

/// Process-wide map from connection identity to its current producer task,
/// if any. An entry exists for every currently-handled connection and for
/// no other; the value is `None` iff nothing is streaming for it.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    entries: DashMap<ConnectionId, Option<ProducerHandle>>,
    next_id: AtomicU64,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh identity for a newly accepted connection.
    pub fn issue_id(&self) -> ConnectionId {
        ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Insert a fresh entry with no producer.
    pub fn register(&self, id: ConnectionId) -> Result<(), RegistryError> {
        match self.entries.entry(id) {
            Entry::Occupied(_) => Err(RegistryError::AlreadyRegistered(id)),
            Entry::Vacant(slot) => {
                slot.insert(None);
                Ok(())
            }
        }
    }

    /// Associate a producer with a registered connection.
    ///
    /// Refuses to displace a live producer - overwriting would orphan a
    /// running task. A rejected handle is aborted before the error is
    /// returned so it cannot keep streaming either.
    pub fn set_producer(
        &self,
        id: ConnectionId,
        handle: ProducerHandle,
    ) -> Result<(), RegistryError> {
        let Some(mut entry) = self.entries.get_mut(&id) else {
            handle.abort();
            return Err(RegistryError::NotRegistered(id));
        };
        if entry.is_some() {
            handle.abort();
            return Err(RegistryError::ProducerAlreadyActive(id));
        }
        *entry = Some(handle);
        Ok(())
    }

    /// Detach and return the current producer, leaving the entry idle.
    /// Idempotent: `None` when nothing is streaming or the connection is
    /// already gone. The registry reflects "no producer" the moment this
    /// returns, so a Start processed right after can never race into a
    /// double-producer state.
    pub fn take_producer(&self, id: ConnectionId) -> Option<ProducerHandle> {
        self.entries.get_mut(&id).and_then(|mut entry| entry.take())
    }

    /// Whether a producer is currently associated with `id`.
    pub fn is_streaming(&self, id: ConnectionId) -> bool {
        self.entries.get(&id).is_some_and(|entry| entry.is_some())
    }

    /// Remove the entry for a closed connection. Called exactly once, from
    /// the controller's cleanup path, after any producer was shut down.
    pub fn unregister(&self, id: ConnectionId) {
        if self.entries.remove(&id).is_none() {
            debug_assert!(false, "unregister of unknown {id}");
            error!(%id, "unregister of unknown connection");
        }
    }

    /// Number of currently registered connections.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
