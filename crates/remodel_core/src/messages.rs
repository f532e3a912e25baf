//! User-facing message extraction.
//!
//! Backends embed a `messages` array in response bodies, on success and
//! on error alike. The core forwards them to a [`MessageSink`] wherever
//! a body passes through its hands; message handling is a side effect
//! and never changes how an operation succeeds or fails.

use crate::error::TransportFailure;
use parking_lot::Mutex;
use tracing::info;

/// Destination for user-facing messages mined from response bodies.
pub trait MessageSink: Send + Sync {
    /// Displays a batch of messages.
    fn display(&self, messages: &[String]);
}

/// Default sink that forwards messages to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl MessageSink for LogSink {
    fn display(&self, messages: &[String]) {
        info!(?messages, "server messages");
    }
}

/// Test sink that records everything it is asked to display.
#[derive(Default)]
pub struct RecordingSink {
    messages: Mutex<Vec<String>>,
}

impl RecordingSink {
    /// Creates an empty recording sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every message displayed so far.
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }
}

impl MessageSink for RecordingSink {
    fn display(&self, messages: &[String]) {
        self.messages.lock().extend_from_slice(messages);
    }
}

/// Reserved envelope field carrying user-facing messages.
pub(crate) const MESSAGES_FIELD: &str = "messages";

/// Extracts the `messages` array from a response body, if present.
pub(crate) fn extract_messages(body: &serde_json::Value) -> Option<Vec<String>> {
    let list = body.get(MESSAGES_FIELD)?.as_array()?;
    Some(
        list.iter()
            .filter_map(|m| m.as_str().map(String::from))
            .collect(),
    )
}

/// Forwards any messages in a success body to the sink.
pub(crate) fn forward_messages(sink: &dyn MessageSink, body: &serde_json::Value) {
    if let Some(messages) = extract_messages(body) {
        if !messages.is_empty() {
            sink.display(&messages);
        }
    }
}

/// Forwards any messages in an error body to the sink, best effort.
pub(crate) fn forward_failure_messages(sink: &dyn MessageSink, failure: &TransportFailure) {
    if let Some(body) = failure.body_json() {
        forward_messages(sink, &body);
    }
}
