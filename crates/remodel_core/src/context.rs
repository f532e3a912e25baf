//! The injected collaborator bundle.

use crate::messages::{LogSink, MessageSink};
use crate::transport::HttpTransport;
use remodel_endpoint::BaseUrl;
use std::sync::Arc;

/// Collaborators shared by every record and collection of one client.
///
/// Built once at application startup and passed explicitly to each
/// resource at construction; there is no global context store. Holds
/// the transport, the message sink and the base URL.
#[derive(Clone)]
pub struct ClientContext {
    transport: Arc<dyn HttpTransport>,
    messages: Arc<dyn MessageSink>,
    base: BaseUrl,
}

impl ClientContext {
    /// Creates a context over a transport, with the log-backed message
    /// sink and the root base URL.
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            messages: Arc::new(LogSink),
            base: BaseUrl::default(),
        }
    }

    /// Replaces the message sink.
    pub fn with_messages(mut self, messages: Arc<dyn MessageSink>) -> Self {
        self.messages = messages;
        self
    }

    /// Replaces the base URL.
    pub fn with_base(mut self, base: BaseUrl) -> Self {
        self.base = base;
        self
    }

    /// The transport requests go through.
    pub fn transport(&self) -> &dyn HttpTransport {
        self.transport.as_ref()
    }

    /// The sink user-facing messages are forwarded to.
    pub fn messages(&self) -> &dyn MessageSink {
        self.messages.as_ref()
    }

    /// The base URL resource paths are joined under.
    pub fn base(&self) -> &BaseUrl {
        &self.base
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::RecordingSink;
    use crate::transport::{HttpRequest, MockTransport};
    use serde_json::json;

    #[test]
    fn builder_replaces_collaborators() {
        let transport = Arc::new(MockTransport::new());
        let sink = Arc::new(RecordingSink::new());

        let context = ClientContext::new(transport.clone())
            .with_messages(sink.clone())
            .with_base(BaseUrl::new("/admin"));

        assert_eq!(context.base().join("items"), "/admin/items");

        transport.enqueue_ok(json!({}));
        context.transport().send(&HttpRequest::get("/x")).unwrap();
        assert_eq!(transport.request_count(), 1);

        context.messages().display(&["hi".into()]);
        assert_eq!(sink.messages(), vec!["hi"]);
    }
}
