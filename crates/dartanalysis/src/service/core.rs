//! Core service management
//!
//! Provides the [`AnalysisService`] struct, its construction and lifecycle.

use crate::config::ServiceConfig;
use crate::correlator::{CloseReason, Correlator};
use crate::error::{AnalysisError, Result};
use crate::events::{EventRouter, EventStream};
use crate::lifecycle::ServiceState;
use crate::routing::MessageRouter;
use dartanalysis_protocol::commands::ServerShutdown;
use dartanalysis_protocol::{Command, NoParams, TopicPayload};
use dartanalysis_transport::{ProcessConfig, StdioTransport, Transport};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

/// A connection to one analysis server
///
/// Construct with [`AnalysisService::launch`] (or one of the lower-level
/// constructors) inside a tokio runtime. Every instance owns its own
/// process, request ids and subscribers.
pub struct AnalysisService {
    /// Per-instance id for log correlation
    pub(crate) instance_id: Uuid,

    /// Line transport to the server
    pub(crate) transport: Arc<dyn Transport>,

    /// Pending request bookkeeping
    pub(crate) correlator: Arc<Correlator>,

    /// Notification subscribers
    pub(crate) events: Arc<EventRouter>,

    /// Lifecycle state
    pub(crate) state: Mutex<ServiceState>,
}

impl AnalysisService {
    /// Launch the server described by `config`
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::Config`] if the SDK or script is missing and
    /// [`AnalysisError::Transport`] if the process cannot be started.
    pub fn launch(config: ServiceConfig) -> Result<Self> {
        config.validate()?;
        Self::spawn(config.to_process_config())
    }

    /// Spawn a server from an explicit process description
    pub fn spawn(process: ProcessConfig) -> Result<Self> {
        let transport = StdioTransport::spawn(process)?;
        Self::with_transport(Arc::new(transport))
    }

    /// Run the client over an existing transport
    ///
    /// The transport's read loop is started here.
    pub fn with_transport(transport: Arc<dyn Transport>) -> Result<Self> {
        let service = Self {
            instance_id: Uuid::new_v4(),
            correlator: Arc::new(Correlator::new(Arc::clone(&transport))),
            events: Arc::new(EventRouter::new()),
            transport,
            state: Mutex::new(ServiceState::Created),
        };

        let router = MessageRouter::new(&service.correlator, &service.events);
        service.transport.start(Arc::new(router))?;
        service.transition(ServiceState::Running);

        tracing::info!(instance = %service.instance_id, "analysis service running");
        Ok(service)
    }

    fn lock_state(&self) -> MutexGuard<'_, ServiceState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Move to `next` if that goes forward; returns whether it did
    fn transition(&self, next: ServiceState) -> bool {
        let mut state = self.lock_state();
        if !state.can_transition_to(next) {
            return false;
        }
        tracing::debug!(instance = %self.instance_id, from = %*state, to = %next, "state change");
        *state = next;
        true
    }

    /// Unique id of this service instance
    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    /// Current lifecycle state
    pub fn state(&self) -> ServiceState {
        *self.lock_state()
    }

    /// Whether the server connection is still open
    pub async fn is_connected(&self) -> bool {
        !self.state().is_disposed() && self.transport.is_connected().await
    }

    /// Number of requests still waiting for a response
    pub fn pending_requests(&self) -> usize {
        self.correlator.pending_count()
    }

    /// Send any command and wait for its result
    ///
    /// There is no built-in timeout; wrap the call in
    /// [`tokio::time::timeout`] if needed.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::Disposed`] without sending anything once the
    /// service is disposed. See [`Correlator::send`] for the rest.
    #[tracing::instrument(
        name = "request",
        skip(self, params),
        fields(instance = %self.instance_id, method = C::METHOD)
    )]
    pub async fn send<C: Command>(&self, params: &C::Params) -> Result<C::Result> {
        if self.state().is_disposed() {
            return Err(AnalysisError::Disposed);
        }
        self.correlator.send::<C>(params).await
    }

    /// Subscribe to notifications carrying payload `T`
    ///
    /// Only notifications arriving after this call are delivered.
    pub fn subscribe<T: TopicPayload>(&self) -> EventStream<T> {
        self.events.subscribe::<T>()
    }

    /// Tear down the connection
    ///
    /// Fails every pending request with [`AnalysisError::ConnectionClosed`],
    /// ends every notification stream, and kills the server process. Calling
    /// it again does nothing.
    pub async fn dispose(&self) -> Result<()> {
        if !self.transition(ServiceState::Disposed) {
            return Ok(());
        }

        tracing::info!(
            instance = %self.instance_id,
            pending = self.correlator.pending_count(),
            "disposing analysis service"
        );
        self.correlator.close(CloseReason::Disposed);
        self.events.close();
        self.transport.close().await?;
        Ok(())
    }

    /// Ask the server to shut down, then dispose
    ///
    /// A server that exits before answering is not an error.
    pub async fn shutdown(&self) -> Result<()> {
        let outcome = self.send::<ServerShutdown>(&NoParams {}).await;
        self.dispose().await?;

        match outcome {
            Ok(_) => Ok(()),
            Err(e) if e.is_connection_lost() => Ok(()),
            Err(e) => Err(e),
        }
    }
}

impl std::fmt::Debug for AnalysisService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisService")
            .field("instance_id", &self.instance_id)
            .field("state", &self.state())
            .field("pending_requests", &self.pending_requests())
            .finish()
    }
}
