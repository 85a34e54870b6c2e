//! Notification fan-out
//!
//! The router keeps a registry of subscribers per [`Topic`]. The read loop
//! publishes every notification it decodes; each current subscriber of the
//! matching topic receives its own copy through an unbounded channel, so a
//! slow consumer never stalls the reader or another subscriber.

use dartanalysis_protocol::{Notification, Topic, TopicPayload};
use futures::Stream;
use serde_json::Value;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::task::{Context, Poll};
use tokio::sync::mpsc;

/// An error item delivered on a notification stream
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotificationError {
    /// A notification of this topic arrived with a payload that did not
    /// match its shape; the stream keeps going
    #[error("Malformed {topic} notification: {message}")]
    Decode {
        /// Topic of the dropped notification
        topic: Topic,
        /// Decoder message
        message: String,
    },

    /// The connection ended; the stream ends after this item
    #[error("Connection to the analysis server closed")]
    ConnectionClosed,
}

type Item = Result<Notification, NotificationError>;

struct Subscriber {
    id: u64,
    sender: mpsc::UnboundedSender<Item>,
}

#[derive(Default)]
struct Registry {
    topics: HashMap<Topic, Vec<Subscriber>>,
    closed: bool,
}

fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Routes decoded notifications to topic subscribers
#[derive(Default)]
pub struct EventRouter {
    registry: Mutex<Registry>,
    next_subscriber: AtomicU64,
}

impl EventRouter {
    /// Create a router with no subscribers
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to the topic of `T`
    ///
    /// The stream sees every notification of that topic published after this
    /// call, in publish order. Subscribing to a closed router yields a stream
    /// that has already ended.
    pub fn subscribe<T: TopicPayload>(self: &Arc<Self>) -> EventStream<T> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = self.next_subscriber.fetch_add(1, Ordering::Relaxed);

        {
            let mut registry = lock(&self.registry);
            // Dropping the sender here ends the stream right away.
            if !registry.closed {
                registry
                    .topics
                    .entry(T::TOPIC)
                    .or_default()
                    .push(Subscriber { id, sender });
            }
        }
        tracing::debug!(topic = %T::TOPIC, subscriber = id, "subscribed");

        EventStream {
            receiver,
            _guard: Unsubscribe {
                router: Arc::downgrade(self),
                topic: T::TOPIC,
                id,
            },
            _payload: PhantomData,
        }
    }

    fn unsubscribe(&self, topic: Topic, id: u64) {
        let mut registry = lock(&self.registry);
        if let Some(subscribers) = registry.topics.get_mut(&topic) {
            subscribers.retain(|s| s.id != id);
            if subscribers.is_empty() {
                registry.topics.remove(&topic);
            }
        }
    }

    /// Publish a raw notification
    ///
    /// Unknown events are ignored. A payload that does not decode is turned
    /// into a [`NotificationError::Decode`] item for the topic's subscribers.
    pub fn publish(&self, event: &str, params: Value) {
        let Some(topic) = Topic::from_event(event) else {
            tracing::trace!(event, "ignoring unknown notification");
            return;
        };

        let item = Notification::decode(topic, params).map_err(|e| {
            tracing::warn!(%topic, error = %e, "malformed notification");
            NotificationError::Decode {
                topic,
                message: e.to_string(),
            }
        });
        self.deliver(topic, item);
    }

    fn deliver(&self, topic: Topic, item: Item) {
        let mut registry = lock(&self.registry);
        let Some(subscribers) = registry.topics.get_mut(&topic) else {
            return;
        };

        // Sends fail only for receivers dropped before their guard ran.
        subscribers.retain(|s| s.sender.send(item.clone()).is_ok());
        if subscribers.is_empty() {
            registry.topics.remove(&topic);
        }
    }

    /// End every stream with a [`NotificationError::ConnectionClosed`] item
    ///
    /// Only the first call has an effect.
    pub fn close(&self) {
        let topics = {
            let mut registry = lock(&self.registry);
            if registry.closed {
                return;
            }
            registry.closed = true;
            std::mem::take(&mut registry.topics)
        };

        for subscriber in topics.into_values().flatten() {
            let _ = subscriber.sender.send(Err(NotificationError::ConnectionClosed));
        }
    }

    /// Number of live subscribers on `topic`
    pub fn subscriber_count(&self, topic: Topic) -> usize {
        lock(&self.registry).topics.get(&topic).map_or(0, Vec::len)
    }
}

struct Unsubscribe {
    router: Weak<EventRouter>,
    topic: Topic,
    id: u64,
}

impl Drop for Unsubscribe {
    fn drop(&mut self) {
        if let Some(router) = self.router.upgrade() {
            router.unsubscribe(self.topic, self.id);
        }
    }
}

/// Stream of one topic's notifications
///
/// Yields `Ok(payload)` per notification and `Err` for malformed payloads
/// and for the end of the connection. Dropping it unsubscribes.
pub struct EventStream<T> {
    receiver: mpsc::UnboundedReceiver<Item>,
    _guard: Unsubscribe,
    _payload: PhantomData<fn() -> T>,
}

impl<T: TopicPayload> EventStream<T> {
    /// Topic this stream is subscribed to
    pub fn topic(&self) -> Topic {
        T::TOPIC
    }

    /// Wait for the next item; `None` once the stream has ended
    pub async fn recv(&mut self) -> Option<Result<T, NotificationError>> {
        futures::StreamExt::next(self).await
    }
}

impl<T: TopicPayload> Stream for EventStream<T> {
    type Item = Result<T, NotificationError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            match this.receiver.poll_recv(cx) {
                Poll::Ready(Some(Ok(notification))) => {
                    if let Some(payload) = T::from_notification(notification) {
                        return Poll::Ready(Some(Ok(payload)));
                    }
                }
                Poll::Ready(Some(Err(e))) => return Poll::Ready(Some(Err(e))),
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

impl<T> std::fmt::Debug for EventStream<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStream")
            .field("topic", &self._guard.topic)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dartanalysis_protocol::notifications::{
        AnalysisHighlightsNotification, AnalysisOutlineNotification, ServerStatusNotification,
    };
    use futures::StreamExt;
    use serde_json::json;
    use tokio_test::{assert_pending, assert_ready};

    fn highlights(file: &str) -> Value {
        json!({
            "file": file,
            "regions": [{ "type": "KEYWORD", "offset": 0, "length": 5 }]
        })
    }

    #[tokio::test]
    async fn test_subscribers_receive_in_order() {
        let router = Arc::new(EventRouter::new());
        let mut stream = router.subscribe::<AnalysisHighlightsNotification>();

        router.publish("analysis.highlights", highlights("/a.dart"));
        router.publish("analysis.highlights", highlights("/b.dart"));

        assert_eq!(stream.next().await.unwrap().unwrap().file, "/a.dart");
        assert_eq!(stream.next().await.unwrap().unwrap().file, "/b.dart");
    }

    #[tokio::test]
    async fn test_every_subscriber_gets_a_copy() {
        let router = Arc::new(EventRouter::new());
        let mut first = router.subscribe::<AnalysisHighlightsNotification>();
        let mut second = router.subscribe::<AnalysisHighlightsNotification>();

        router.publish("analysis.highlights", highlights("/a.dart"));

        assert_eq!(first.next().await.unwrap().unwrap().file, "/a.dart");
        assert_eq!(second.next().await.unwrap().unwrap().file, "/a.dart");
    }

    #[tokio::test]
    async fn test_topics_are_independent() {
        let router = Arc::new(EventRouter::new());
        let mut outline = router.subscribe::<AnalysisOutlineNotification>();
        let mut status = router.subscribe::<ServerStatusNotification>();

        router.publish("analysis.outline", json!({ "file": "/a.dart" }));
        router.publish(
            "server.status",
            json!({ "analysis": { "isAnalyzing": false } }),
        );
        router.close();

        // The malformed outline only shows up on the outline stream.
        assert!(matches!(
            outline.next().await,
            Some(Err(NotificationError::Decode { topic: Topic::AnalysisOutline, .. }))
        ));
        let status_item = status.next().await.unwrap().unwrap();
        assert!(!status_item.analysis.unwrap().is_analyzing);
    }

    #[tokio::test]
    async fn test_decode_error_does_not_end_stream() {
        let router = Arc::new(EventRouter::new());
        let mut stream = router.subscribe::<AnalysisHighlightsNotification>();

        router.publish("analysis.highlights", json!({ "file": 7 }));
        router.publish("analysis.highlights", highlights("/ok.dart"));

        assert!(matches!(stream.next().await, Some(Err(NotificationError::Decode { .. }))));
        assert_eq!(stream.next().await.unwrap().unwrap().file, "/ok.dart");
    }

    #[test]
    fn test_stream_wakes_on_publish() {
        let router = Arc::new(EventRouter::new());
        let mut stream = tokio_test::task::spawn(router.subscribe::<AnalysisHighlightsNotification>());

        assert_pending!(stream.poll_next());
        router.publish("analysis.highlights", highlights("/a.dart"));
        assert!(stream.is_woken());

        let item = assert_ready!(stream.poll_next());
        assert_eq!(item.unwrap().unwrap().file, "/a.dart");
    }

    #[test]
    fn test_unknown_event_is_ignored() {
        let router = Arc::new(EventRouter::new());
        let _stream = router.subscribe::<AnalysisHighlightsNotification>();

        router.publish("completion.results", json!({}));
        assert_eq!(router.subscriber_count(Topic::AnalysisHighlights), 1);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let router = Arc::new(EventRouter::new());
        let stream = router.subscribe::<AnalysisHighlightsNotification>();
        assert_eq!(router.subscriber_count(Topic::AnalysisHighlights), 1);

        drop(stream);
        assert_eq!(router.subscriber_count(Topic::AnalysisHighlights), 0);
    }

    #[tokio::test]
    async fn test_close_ends_streams_with_error_item() {
        let router = Arc::new(EventRouter::new());
        let mut stream = router.subscribe::<AnalysisHighlightsNotification>();

        router.close();
        router.close();

        assert_eq!(stream.next().await, Some(Err(NotificationError::ConnectionClosed)));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_subscribe_after_close_is_already_ended() {
        let router = Arc::new(EventRouter::new());
        router.close();

        let mut stream = router.subscribe::<AnalysisHighlightsNotification>();
        assert!(stream.next().await.is_none());
        assert_eq!(router.subscriber_count(Topic::AnalysisHighlights), 0);
    }
}
