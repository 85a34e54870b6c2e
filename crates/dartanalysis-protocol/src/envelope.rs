//! Message envelopes exchanged with the analysis server
//!
//! Every line on the wire is one JSON object. Outgoing lines are always
//! [`Request`]s. Incoming lines are classified by shape into an
//! [`IncomingMessage`]: anything carrying an `id` is a response, anything
//! carrying an `event` and no `id` is a notification.

use crate::error::{ProtocolError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifier correlating a request with its response
///
/// Opaque on the wire. The client allocates ids from a counter, but no
/// particular value has any special meaning.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    /// Create from raw string
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<u64> for RequestId {
    fn from(sequence: u64) -> Self {
        Self(sequence.to_string())
    }
}

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outgoing request: `{"id": ..., "method": ..., "params": ...}`
#[derive(Debug, Serialize)]
pub struct Request<'a, P> {
    /// Correlation id
    pub id: &'a RequestId,

    /// Method name, e.g. `analysis.setSubscriptions`
    pub method: &'a str,

    /// Command parameters
    pub params: &'a P,
}

impl<'a, P: Serialize> Request<'a, P> {
    /// Build a request envelope
    pub fn new(id: &'a RequestId, method: &'a str, params: &'a P) -> Self {
        Self { id, method, params }
    }

    /// Serialize to a JSON value ready for the transport
    pub fn to_value(&self) -> Result<Value> {
        serde_json::to_value(self).map_err(ProtocolError::from)
    }
}

/// Error object carried by a failed response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestError {
    /// Server error code
    pub code: i64,

    /// Human-readable message
    pub message: String,

    /// Server-side stack trace, when the server sends one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<String>,
}

/// Response to a previously issued request
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResponseMessage {
    /// Id of the request this answers
    pub id: RequestId,

    /// Result object; servers omit it for commands without a result
    #[serde(default)]
    pub result: Option<Value>,

    /// Present when the request failed
    #[serde(default)]
    pub error: Option<RequestError>,
}

impl ResponseMessage {
    /// Split into the request's outcome
    ///
    /// A response with an `error` is a failure regardless of any `result`.
    /// A response with neither yields JSON `null`.
    pub fn into_outcome(self) -> std::result::Result<Value, RequestError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

/// Unsolicited server notification
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NotificationMessage {
    /// Event name, e.g. `analysis.highlights`
    pub event: String,

    /// Raw event parameters
    #[serde(default)]
    pub params: Value,
}

/// A decoded incoming line
///
/// Variant order matters: the response shape is tried first, so the
/// presence of `id` decides the classification.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum IncomingMessage {
    /// Has an `id`
    Response(ResponseMessage),

    /// Has an `event` and no `id`
    Notification(NotificationMessage),
}

impl IncomingMessage {
    /// Decode one line read from the server
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::SerializationError`] for malformed JSON and
    /// [`ProtocolError::UnrecognizedMessage`] for JSON of neither shape.
    pub fn from_line(line: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(line)?;
        Self::deserialize(value).map_err(|e| ProtocolError::UnrecognizedMessage(e.to_string()))
    }
}
