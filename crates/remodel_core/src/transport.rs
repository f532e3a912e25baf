//! Transport layer abstraction.
//!
//! The core never talks HTTP itself; it hands [`HttpRequest`] values to
//! an injected [`HttpTransport`] and interprets the JSON result. This
//! keeps the actual client library (reqwest, ureq, a browser bridge)
//! out of the core and makes every operation drivable from tests.

use crate::error::TransportFailure;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// HTTP method of a core-issued request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Read a resource.
    Get,
    /// Create a resource.
    Post,
    /// Update a resource.
    Put,
    /// Delete a resource.
    Delete,
}

impl Method {
    /// Wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

/// One request handed to the transport.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// Absolute URL, query string included.
    pub url: String,
    /// HTTP method.
    pub method: Method,
    /// JSON body, for writes.
    pub body: Option<serde_json::Value>,
}

impl HttpRequest {
    /// Creates a GET request.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: Method::Get,
            body: None,
        }
    }

    /// Creates a POST request with a JSON body.
    pub fn post(url: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            url: url.into(),
            method: Method::Post,
            body: Some(body),
        }
    }

    /// Creates a PUT request with a JSON body.
    pub fn put(url: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            url: url.into(),
            method: Method::Put,
            body: Some(body),
        }
    }

    /// Creates a PUT request without a body.
    pub fn put_empty(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: Method::Put,
            body: None,
        }
    }

    /// Creates a DELETE request.
    pub fn delete(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: Method::Delete,
            body: None,
        }
    }
}

/// The network seam.
///
/// `send` blocks until the exchange completes and returns the decoded
/// JSON body on success, or a [`TransportFailure`] carrying whatever
/// could be recovered. Implementations must be callable from multiple
/// threads.
pub trait HttpTransport: Send + Sync {
    /// Performs one request/response exchange.
    fn send(&self, request: &HttpRequest) -> Result<serde_json::Value, TransportFailure>;
}

/// A canned-response transport for tests.
///
/// Responses are served from a FIFO queue; every request is recorded
/// for later inspection. An empty queue yields a transport failure, so
/// a test that issues more requests than it canned fails loudly.
#[derive(Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<Result<serde_json::Value, TransportFailure>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    /// Creates a mock with an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a successful JSON response.
    pub fn enqueue_ok(&self, body: serde_json::Value) {
        self.responses.lock().push_back(Ok(body));
    }

    /// Queues a failure.
    pub fn enqueue_err(&self, failure: TransportFailure) {
        self.responses.lock().push_back(Err(failure));
    }

    /// Returns a copy of every request sent so far.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    /// Number of requests sent so far.
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Returns the most recent request, if any.
    pub fn last_request(&self) -> Option<HttpRequest> {
        self.requests.lock().last().cloned()
    }
}

impl HttpTransport for MockTransport {
    fn send(&self, request: &HttpRequest) -> Result<serde_json::Value, TransportFailure> {
        self.requests.lock().push(request.clone());
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(TransportFailure::network("no canned response queued")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn mock_serves_responses_in_order() {
        let transport = MockTransport::new();
        transport.enqueue_ok(json!({"id": 1}));
        transport.enqueue_ok(json!({"id": 2}));

        let first = transport.send(&HttpRequest::get("/a")).unwrap();
        let second = transport.send(&HttpRequest::get("/b")).unwrap();
        assert_eq!(first["id"], 1);
        assert_eq!(second["id"], 2);
    }

    #[test]
    fn mock_records_requests() {
        let transport = MockTransport::new();
        transport.enqueue_ok(json!({}));

        transport
            .send(&HttpRequest::put("/items/1", json!({"name": "x"})))
            .unwrap();

        assert_eq!(transport.request_count(), 1);
        let request = transport.last_request().unwrap();
        assert_eq!(request.method, Method::Put);
        assert_eq!(request.url, "/items/1");
        assert_eq!(request.body.unwrap()["name"], "x");
    }

    #[test]
    fn empty_queue_is_a_failure() {
        let transport = MockTransport::new();
        let err = transport.send(&HttpRequest::get("/a")).unwrap_err();
        assert!(err.status.is_none());
    }

    #[test]
    fn method_wire_names() {
        assert_eq!(Method::Get.as_str(), "GET");
        assert_eq!(Method::Delete.as_str(), "DELETE");
    }
}
