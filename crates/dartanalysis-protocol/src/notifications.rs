//! Notification topics and payloads
//!
//! The table at the bottom of this module is the closed mapping from wire
//! event name to [`Topic`] and payload type. Events missing from it are
//! ignored by the client, so newer servers can add events freely.

use crate::error::{ProtocolError, Result};
use crate::types::{
    AnalysisErrorInfo, HighlightRegion, NavigationRegion, NavigationTarget, Outline,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `server.connected` payload
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ServerConnectedNotification {
    /// Server version
    #[serde(default)]
    pub version: Option<String>,

    /// Server process id
    #[serde(default)]
    pub pid: Option<u32>,
}

/// Analysis progress reported in `server.status`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisStatus {
    /// Whether analysis is running
    pub is_analyzing: bool,

    /// What is being analyzed, when known
    #[serde(default)]
    pub analysis_target: Option<String>,
}

/// `server.status` payload
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ServerStatusNotification {
    /// Analysis progress, absent when unchanged
    #[serde(default)]
    pub analysis: Option<AnalysisStatus>,
}

/// `server.error` payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerErrorNotification {
    /// Whether the server is about to exit
    pub is_fatal: bool,

    /// Error description
    pub message: String,

    /// Server-side stack trace
    #[serde(default)]
    pub stack_trace: String,
}

/// `analysis.errors` payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisErrorsNotification {
    /// File the errors belong to
    pub file: String,

    /// Full set of current errors; replaces any earlier set
    pub errors: Vec<AnalysisErrorInfo>,
}

/// `analysis.highlights` payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisHighlightsNotification {
    /// File the regions belong to
    pub file: String,

    /// Highlighted regions
    pub regions: Vec<HighlightRegion>,
}

/// `analysis.navigation` payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisNavigationNotification {
    /// File the regions belong to
    pub file: String,

    /// Navigable regions
    pub regions: Vec<NavigationRegion>,

    /// Targets referenced by index from `regions`
    #[serde(default)]
    pub targets: Vec<NavigationTarget>,

    /// Files referenced by index from `targets`
    #[serde(default)]
    pub files: Vec<String>,
}

impl AnalysisNavigationNotification {
    /// Resolve a region's targets to `(file, target)` pairs
    ///
    /// Indices pointing outside the notification are skipped.
    pub fn resolve<'a>(
        &'a self,
        region: &'a NavigationRegion,
    ) -> impl Iterator<Item = (&'a str, &'a NavigationTarget)> + 'a {
        region.targets.iter().filter_map(move |&index| {
            let target = self.targets.get(index)?;
            let file = self.files.get(target.file_index)?;
            Some((file.as_str(), target))
        })
    }
}

/// `analysis.outline` payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisOutlineNotification {
    /// File the outline describes
    pub file: String,

    /// Root outline node
    pub outline: Outline,
}

/// A payload type bound to exactly one topic
pub trait TopicPayload: Clone + Send + 'static {
    /// The topic this payload is delivered on
    const TOPIC: Topic;

    /// Take the payload out of a notification of this topic
    fn from_notification(notification: Notification) -> Option<Self>;
}

macro_rules! topics {
    ($(
        $(#[$meta:meta])*
        $topic:ident => $event:literal, $payload:ident;
    )*) => {
        /// Notification category used for subscriber routing
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum Topic {
            $( $(#[$meta])* $topic, )*
        }

        impl Topic {
            /// Every known topic
            pub const ALL: &'static [Topic] = &[$(Topic::$topic),*];

            /// Look up the topic of a wire event name
            pub fn from_event(event: &str) -> Option<Topic> {
                match event {
                    $( $event => Some(Topic::$topic), )*
                    _ => None,
                }
            }

            /// Wire event name of this topic
            pub fn event(&self) -> &'static str {
                match self {
                    $( Topic::$topic => $event, )*
                }
            }
        }

        /// A decoded notification
        #[derive(Debug, Clone, PartialEq)]
        pub enum Notification {
            $( $(#[$meta])* $topic($payload), )*
        }

        impl Notification {
            /// Decode raw params into the payload type of `topic`
            ///
            /// # Errors
            ///
            /// Returns [`ProtocolError::InvalidPayload`] when the params do not
            /// match the topic's payload shape.
            pub fn decode(topic: Topic, params: Value) -> Result<Notification> {
                // Absent params decode like an empty object.
                let params = if params.is_null() { Value::Object(Default::default()) } else { params };
                let invalid = |e: serde_json::Error| ProtocolError::InvalidPayload {
                    event: topic.event().to_string(),
                    reason: e.to_string(),
                };
                match topic {
                    $( Topic::$topic => serde_json::from_value(params)
                        .map(Notification::$topic)
                        .map_err(invalid), )*
                }
            }

            /// Topic this notification belongs to
            pub fn topic(&self) -> Topic {
                match self {
                    $( Notification::$topic(_) => Topic::$topic, )*
                }
            }
        }

        $(
            impl TopicPayload for $payload {
                const TOPIC: Topic = Topic::$topic;

                fn from_notification(notification: Notification) -> Option<Self> {
                    match notification {
                        Notification::$topic(payload) => Some(payload),
                        #[allow(unreachable_patterns)]
                        _ => None,
                    }
                }
            }
        )*
    };
}

topics! {
    /// `server.connected`
    ServerConnected => "server.connected", ServerConnectedNotification;
    /// `server.status`
    ServerStatus => "server.status", ServerStatusNotification;
    /// `server.error`
    ServerError => "server.error", ServerErrorNotification;
    /// `analysis.errors`
    AnalysisErrors => "analysis.errors", AnalysisErrorsNotification;
    /// `analysis.highlights`
    AnalysisHighlights => "analysis.highlights", AnalysisHighlightsNotification;
    /// `analysis.navigation`
    AnalysisNavigation => "analysis.navigation", AnalysisNavigationNotification;
    /// `analysis.outline`
    AnalysisOutline => "analysis.outline", AnalysisOutlineNotification;
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.event())
    }
}
