//! Message router for incoming server traffic
//!
//! Sits between the transport's read loop and the two consumers of what it
//! reads: responses go to the [`Correlator`], notifications to the
//! [`EventRouter`]. When the connection ends, both are closed so nothing
//! waits forever.

use crate::correlator::{CloseReason, Correlator};
use crate::events::EventRouter;
use dartanalysis_protocol::IncomingMessage;
use dartanalysis_transport::MessageHandler;
use std::sync::{Arc, Weak};

/// Dispatches decoded messages from the read loop
///
/// Holds weak references so a running read loop never keeps a dropped
/// service alive.
pub struct MessageRouter {
    correlator: Weak<Correlator>,
    events: Weak<EventRouter>,
}

impl MessageRouter {
    /// Route into `correlator` and `events`
    pub fn new(correlator: &Arc<Correlator>, events: &Arc<EventRouter>) -> Self {
        Self {
            correlator: Arc::downgrade(correlator),
            events: Arc::downgrade(events),
        }
    }
}

impl MessageHandler for MessageRouter {
    fn handle_message(&self, message: IncomingMessage) {
        match message {
            IncomingMessage::Response(response) => {
                if let Some(correlator) = self.correlator.upgrade() {
                    correlator.complete(response);
                }
            }
            IncomingMessage::Notification(notification) => {
                if let Some(events) = self.events.upgrade() {
                    events.publish(&notification.event, notification.params);
                }
            }
        }
    }

    fn connection_closed(&self) {
        tracing::info!("analysis server connection closed");
        if let Some(correlator) = self.correlator.upgrade() {
            correlator.close(CloseReason::ConnectionLost);
        }
        if let Some(events) = self.events.upgrade() {
            events.close();
        }
    }
}
