//! Keyed request tracking for stale-response gating.
//!
//! Each load or save is tagged with a [`RequestTicket`] for its
//! `(EntityKind, id)` key. Starting a new request for the same key cancels
//! the previous ticket's token; when a request completes, its result is
//! applied only if its ticket is still the current one for the key.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Catalog,
    Workflow,
    State,
    Transition,
    Validation,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
    pub kind: EntityKind,
    pub id: String,
}

impl RequestKey {
    pub fn new(kind: EntityKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }
}

/// Handle for one issued request.
#[derive(Debug, Clone)]
pub struct RequestTicket {
    pub key: RequestKey,
    pub request_id: u64,
    token: CancellationToken,
}

impl RequestTicket {
    /// Cancelled once a newer request for the same key starts, or the
    /// tracker shuts down.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

#[derive(Debug)]
pub struct RequestTracker {
    next_id: AtomicU64,
    active: Mutex<HashMap<RequestKey, (u64, CancellationToken)>>,
    root: CancellationToken,
}

impl Default for RequestTracker {
    fn default() -> Self {
        Self::new(CancellationToken::new())
    }
}

impl RequestTracker {
    /// All tickets are children of `root`; cancelling it cancels every
    /// outstanding request.
    pub fn new(root: CancellationToken) -> Self {
        Self {
            next_id: AtomicU64::new(1),
            active: Mutex::new(HashMap::new()),
            root,
        }
    }

    /// Start a request for `key`, superseding any earlier one.
    pub fn begin(&self, key: RequestKey) -> RequestTicket {
        let request_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let token = self.root.child_token();

        let previous = self
            .lock()
            .insert(key.clone(), (request_id, token.clone()));
        if let Some((previous_id, previous_token)) = previous {
            tracing::debug!(
                kind = ?key.kind,
                id = %key.id,
                superseded = previous_id,
                request_id,
                "Superseding in-flight request",
            );
            previous_token.cancel();
        }

        RequestTicket {
            key,
            request_id,
            token,
        }
    }

    /// `true` while `ticket` is the newest request for its key.
    pub fn is_current(&self, ticket: &RequestTicket) -> bool {
        !ticket.is_cancelled()
            && self
                .lock()
                .get(&ticket.key)
                .is_some_and(|(id, _)| *id == ticket.request_id)
    }

    /// Forget `ticket` if it is still current. Returns whether it was.
    pub fn finish(&self, ticket: &RequestTicket) -> bool {
        let mut active = self.lock();
        let current = !ticket.is_cancelled()
            && active
                .get(&ticket.key)
                .is_some_and(|(id, _)| *id == ticket.request_id);
        if current {
            active.remove(&ticket.key);
        }
        current
    }

    /// Number of keys with a request in flight.
    pub fn in_flight(&self) -> usize {
        self.lock().len()
    }

    /// Cancel everything, including requests started later.
    pub fn shutdown(&self) {
        self.root.cancel();
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<RequestKey, (u64, CancellationToken)>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
