//! Request/response correlation
//!
//! The correlator allocates request ids, remembers one pending completion
//! per outstanding id, and resolves it when the matching response arrives
//! or when the connection goes away. Each pending request is resolved
//! exactly once.
//!
//! # Concurrency
//!
//! The id counter, the pending map and the closed flag share one mutex,
//! so closing and registering are atomic with respect to each other: a
//! request is either drained by the close or rejected before it is sent.
//! The lock is never held across an `.await`, and completions run after
//! it is released.

use crate::error::{AnalysisError, Result};
use dartanalysis_protocol::{Command, Request, RequestId, ResponseMessage};
use dartanalysis_transport::{Transport, TransportError};
use serde_json::Value;
use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::oneshot;

/// Why the correlator stopped accepting requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The owner disposed the service
    Disposed,

    /// The server process exited or its stream ended
    ConnectionLost,
}

impl CloseReason {
    fn rejection(self) -> AnalysisError {
        match self {
            Self::Disposed => AnalysisError::Disposed,
            Self::ConnectionLost => AnalysisError::ConnectionClosed,
        }
    }
}

/// A write that failed because the server is gone reads as a lost connection
fn write_error(err: TransportError) -> AnalysisError {
    match err {
        TransportError::Closed => AnalysisError::ConnectionClosed,
        TransportError::Io(e) if e.kind() == io::ErrorKind::BrokenPipe => {
            AnalysisError::ConnectionClosed
        }
        other => other.into(),
    }
}

/// Consumes the raw outcome: decodes it and wakes the caller
type Completion = Box<dyn FnOnce(Result<Value>) + Send>;

struct PendingRequest {
    method: &'static str,
    complete: Completion,
}

#[derive(Default)]
struct State {
    next_id: u64,
    pending: HashMap<RequestId, PendingRequest>,
    closed: Option<CloseReason>,
}

/// Acquire the state lock, ignoring poisoning.
///
/// Completions never run under the lock, so a panic while it is held can
/// only come from map bookkeeping and leaves nothing half-updated.
fn lock(state: &Mutex<State>) -> MutexGuard<'_, State> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Matches responses to the requests that caused them
pub struct Correlator {
    transport: Arc<dyn Transport>,
    state: Mutex<State>,
}

impl Correlator {
    /// Create a correlator writing through `transport`
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            state: Mutex::new(State {
                next_id: 1,
                ..State::default()
            }),
        }
    }

    /// Send a command and wait for its result
    ///
    /// # Errors
    ///
    /// - [`AnalysisError::Disposed`] / [`AnalysisError::ConnectionClosed`]
    ///   immediately if the correlator is already closed (nothing is written)
    /// - [`AnalysisError::ConnectionClosed`] if the connection ends while waiting
    /// - [`AnalysisError::Server`] for an error response
    /// - [`AnalysisError::Decode`] if the result has the wrong shape
    /// - [`AnalysisError::Transport`] if the write fails for a reason other
    ///   than the server having gone away
    pub async fn send<C: Command>(&self, params: &C::Params) -> Result<C::Result> {
        let (tx, mut rx) = oneshot::channel::<Result<C::Result>>();
        let complete: Completion = Box::new(move |outcome| {
            let decoded = outcome.and_then(|value| {
                serde_json::from_value::<C::Result>(value)
                    .map_err(|e| AnalysisError::Decode(format!("{}: {}", C::METHOD, e)))
            });
            // The caller may have stopped waiting.
            let _ = tx.send(decoded);
        });

        let id = self.register(C::METHOD, complete)?;

        let message = match Request::new(&id, C::METHOD, params).to_value() {
            Ok(message) => message,
            Err(e) => {
                self.discard(&id);
                return Err(e.into());
            }
        };

        tracing::debug!(%id, method = C::METHOD, "sending request");
        tokio::select! {
            // A close or an early response resolves the caller even while
            // its write is still stuck.
            outcome = &mut rx => return outcome.unwrap_or(Err(AnalysisError::ConnectionClosed)),
            written = self.transport.send_message(message) => {
                // A concurrent close may already have resolved it.
                if let Err(e) = written
                    && self.discard(&id)
                {
                    return Err(write_error(e));
                }
            }
        }

        rx.await.unwrap_or(Err(AnalysisError::ConnectionClosed))
    }

    fn register(&self, method: &'static str, complete: Completion) -> Result<RequestId> {
        let mut state = lock(&self.state);
        if let Some(reason) = state.closed {
            return Err(reason.rejection());
        }

        let id = RequestId::from(state.next_id);
        state.next_id += 1;
        state.pending.insert(id.clone(), PendingRequest { method, complete });
        Ok(id)
    }

    /// Drop a pending request without completing it
    fn discard(&self, id: &RequestId) -> bool {
        lock(&self.state).pending.remove(id).is_some()
    }

    /// Resolve the pending request matching `response`
    ///
    /// Responses for unknown ids are logged and dropped.
    pub fn complete(&self, response: ResponseMessage) {
        let pending = lock(&self.state).pending.remove(&response.id);
        let Some(pending) = pending else {
            tracing::warn!(id = %response.id, "dropping response for unknown request");
            return;
        };

        let id = response.id.clone();
        let outcome = response.into_outcome().map_err(AnalysisError::from);
        match &outcome {
            Ok(_) => tracing::debug!(%id, method = pending.method, "request completed"),
            Err(e) => tracing::debug!(%id, method = pending.method, error = %e, "request failed"),
        }
        (pending.complete)(outcome);
    }

    /// Stop accepting requests and fail every pending one
    ///
    /// Pending requests fail with [`AnalysisError::ConnectionClosed`]; later
    /// sends fail according to `reason`. Only the first call has an effect.
    pub fn close(&self, reason: CloseReason) {
        let drained: Vec<(RequestId, PendingRequest)> = {
            let mut state = lock(&self.state);
            if state.closed.is_some() {
                return;
            }
            state.closed = Some(reason);
            state.pending.drain().collect()
        };

        if !drained.is_empty() {
            tracing::info!(?reason, pending = drained.len(), "failing pending requests");
        }
        for (_, pending) in drained {
            (pending.complete)(Err(AnalysisError::ConnectionClosed));
        }
    }

    /// Why the correlator closed, if it has
    pub fn close_reason(&self) -> Option<CloseReason> {
        lock(&self.state).closed
    }

    /// Number of requests awaiting a response
    pub fn pending_count(&self) -> usize {
        lock(&self.state).pending.len()
    }
}
