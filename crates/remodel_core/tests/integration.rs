//! Integration tests driving records and collections end to end.

use parking_lot::Mutex;
use remodel_core::{
    Attributes, BaseUrl, CallOptions, ClientContext, CollectionConfig, Endpoint, Filter,
    HttpRequest, HttpTransport, Method, MockTransport, Notification, NotificationKind, Order,
    PagedCollection, Paginated, RecordConfig, RecordingSink, RemoteRecord, TransportFailure,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn init_logs() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}

fn attrs(value: Value) -> Attributes {
    value.as_object().cloned().unwrap()
}

fn kinds_of(rx: &std::sync::mpsc::Receiver<Notification>) -> Vec<NotificationKind> {
    rx.try_iter().map(|n| n.kind()).collect()
}

/// A transport that, on its first send, drives a second save into the
/// same record from inside the in-flight window.
struct ReentrantTransport {
    record: Mutex<Option<Arc<RemoteRecord>>>,
    sends: AtomicUsize,
    reentry: Mutex<Option<(bool, bool)>>,
}

impl ReentrantTransport {
    fn new() -> Self {
        Self {
            record: Mutex::new(None),
            sends: AtomicUsize::new(0),
            reentry: Mutex::new(None),
        }
    }

    fn arm(&self, record: Arc<RemoteRecord>) {
        *self.record.lock() = Some(record);
    }

    /// What the overlapping save observed: (rejected as busy, guard
    /// still up during the first save).
    fn reentry_outcome(&self) -> Option<(bool, bool)> {
        *self.reentry.lock()
    }
}

impl HttpTransport for ReentrantTransport {
    fn send(&self, _request: &HttpRequest) -> Result<Value, TransportFailure> {
        self.sends.fetch_add(1, Ordering::SeqCst);

        if let Some(record) = self.record.lock().take() {
            let result = record.save(Attributes::new(), &CallOptions::new());
            let busy = result.err().is_some_and(|e| e.is_busy());
            *self.reentry.lock() = Some((busy, record.processing()));
        }

        Ok(json!({"id": 77, "name": "saved"}))
    }
}

#[test]
fn overlapping_save_is_rejected_and_issues_no_request() {
    init_logs();
    let transport = Arc::new(ReentrantTransport::new());
    let context = Arc::new(ClientContext::new(transport.clone()));
    let record = Arc::new(RemoteRecord::new(
        RecordConfig::new().endpoint(Endpoint::new("items")),
        context,
    ));

    transport.arm(Arc::clone(&record));
    record
        .save(attrs(json!({"name": "first"})), &CallOptions::new())
        .unwrap();

    // The overlapping save was rejected while the guard was up, and
    // only the first save reached the transport.
    assert_eq!(transport.sends.load(Ordering::SeqCst), 1);
    assert_eq!(transport.reentry_outcome(), Some((true, true)));

    // The record is usable again afterwards.
    assert!(!record.processing());
    assert_eq!(record.get("id"), Some(json!(77)));
}

#[test]
fn record_lifecycle_create_edit_reset_update_destroy() {
    init_logs();
    let transport = Arc::new(MockTransport::new());
    let sink = Arc::new(RecordingSink::new());
    let context = Arc::new(
        ClientContext::new(transport.clone())
            .with_messages(sink.clone())
            .with_base(BaseUrl::new("/admin")),
    );

    let record = RemoteRecord::new(
        RecordConfig::new().endpoint(Endpoint::new("apis")),
        context,
    );
    let rx = record.subscribe();

    // Create.
    transport.enqueue_ok(json!({"id": 5, "name": "api", "messages": ["created"]}));
    record
        .save(attrs(json!({"name": "api"})), &CallOptions::new())
        .unwrap();
    let request = transport.last_request().unwrap();
    assert_eq!(request.method, Method::Post);
    assert_eq!(request.url, "/admin/apis");
    assert_eq!(sink.messages(), vec!["created"]);
    assert_eq!(
        kinds_of(&rx),
        vec![
            NotificationKind::Processing,
            NotificationKind::Saving,
            NotificationKind::Processing,
            NotificationKind::Saved,
        ]
    );

    // Local edits, then revert to the synced snapshot.
    record.set("name", json!("renamed"));
    record.set("draft", json!(true));
    record.reset();
    assert_eq!(record.attributes(), attrs(json!({"id": 5, "name": "api"})));

    // Update goes to the record URL.
    transport.enqueue_ok(json!({"id": 5, "name": "api v2"}));
    record
        .save(attrs(json!({"name": "api v2"})), &CallOptions::new())
        .unwrap();
    let request = transport.last_request().unwrap();
    assert_eq!(request.method, Method::Put);
    assert_eq!(request.url, "/admin/apis/5");

    // Destroy waits for server confirmation, then clears the snapshot.
    transport.enqueue_ok(json!({"messages": ["gone"]}));
    record.destroy(&CallOptions::new()).unwrap();
    let request = transport.last_request().unwrap();
    assert_eq!(request.method, Method::Delete);
    assert_eq!(request.url, "/admin/apis/5");
    assert!(sink.messages().contains(&"gone".to_string()));
    assert!(record.backups().is_empty());
}

#[test]
fn save_failure_reports_messages_and_recovers() {
    init_logs();
    let transport = Arc::new(MockTransport::new());
    let sink = Arc::new(RecordingSink::new());
    let context = Arc::new(ClientContext::new(transport.clone()).with_messages(sink.clone()));

    let record = RemoteRecord::new(
        RecordConfig::new().endpoint(Endpoint::new("apis")),
        context,
    );

    transport.enqueue_err(TransportFailure::status(
        422,
        r#"{"messages":["name is required"]}"#,
    ));
    let err = record
        .save(Attributes::new(), &CallOptions::new())
        .unwrap_err();
    assert!(err.is_transport());
    assert_eq!(sink.messages(), vec!["name is required"]);

    // The failed save returned the record to idle; the next one runs.
    transport.enqueue_ok(json!({"id": 1, "name": "n"}));
    record
        .save(attrs(json!({"name": "n"})), &CallOptions::new())
        .unwrap();
    assert_eq!(record.key(), Some("1".into()));
}

#[test]
fn paged_listing_walks_filters_and_sorts() {
    init_logs();
    let transport = Arc::new(MockTransport::new());
    let context = Arc::new(ClientContext::new(transport.clone()).with_base(BaseUrl::new("/admin")));

    let paged = PagedCollection::new(
        CollectionConfig::new()
            .endpoint(Endpoint::new("apis"))
            .record(RecordConfig::new().endpoint(Endpoint::new("apis"))),
        Arc::clone(&context),
    );
    let rx = paged.subscribe();

    // First page.
    transport.enqueue_ok(json!({
        "page": 1, "limit": 10, "total": 25,
        "data": [{"id": 1, "name": "a"}, {"id": 2, "name": "b"}]
    }));
    let info = paged.reload_page().unwrap();
    assert_eq!(info.pages, 3);
    assert_eq!(info.range, (1, 10));
    assert_eq!(paged.len(), 2);
    assert_eq!(
        kinds_of(&rx),
        vec![
            NotificationKind::Fetching,
            NotificationKind::RecordsReplaced,
            NotificationKind::PageLoad,
        ]
    );

    // Walk forward.
    transport.enqueue_ok(json!({
        "page": 2, "limit": 10, "total": 25,
        "data": [{"id": 11, "name": "k"}]
    }));
    let info = paged.next_page().unwrap().unwrap();
    assert_eq!(info.page, 2);
    assert!(transport.last_request().unwrap().url.contains("page=2"));

    // Filter change goes back to page 1 and rides in the query string.
    transport.enqueue_ok(json!({
        "page": 1, "limit": 10, "total": 3,
        "data": [{"id": 2, "name": "b"}]
    }));
    paged
        .apply_filter(Filter::new().term("name", "b"))
        .unwrap();
    let url = transport.last_request().unwrap().url;
    assert!(url.starts_with("/admin/apis?"));
    assert!(url.contains("page=1"));
    assert!(url.contains("filter=name%3Db"));
    assert_eq!(paged.total(), 3);

    // Sort change also resets the page.
    transport.enqueue_ok(json!({
        "page": 1, "limit": 10, "total": 3,
        "data": [{"id": 2, "name": "b"}]
    }));
    paged.apply_sort("name", Order::Desc).unwrap();
    let url = transport.last_request().unwrap().url;
    assert!(url.contains("sortBy=name"));
    assert!(url.contains("order=desc"));

    // Records spawned from rows are full records with their own URL.
    let record = paged.records()[0].clone();
    assert_eq!(record.key(), Some("2".into()));
    transport.enqueue_ok(json!({"id": 2, "name": "b", "detail": "full"}));
    record.fetch(&CallOptions::new()).unwrap();
    assert_eq!(
        transport.last_request().unwrap().url,
        "/admin/apis/2"
    );
}

#[test]
fn adder_flow_saves_then_inserts_at_front() {
    init_logs();
    let transport = Arc::new(MockTransport::new());
    let context = Arc::new(ClientContext::new(transport.clone()));

    let paged = PagedCollection::new(
        CollectionConfig::new()
            .endpoint(Endpoint::new("apis"))
            .record(RecordConfig::new().endpoint(Endpoint::new("apis"))),
        Arc::clone(&context),
    );

    transport.enqueue_ok(json!({
        "page": 1, "limit": 10, "total": 1,
        "data": [{"id": 1, "name": "existing"}]
    }));
    paged.reload_page().unwrap();

    // A fresh record is saved, then placed at the top of the listing.
    let draft = RemoteRecord::new(
        RecordConfig::new().endpoint(Endpoint::new("apis")),
        Arc::clone(&context),
    );
    transport.enqueue_ok(json!({"id": 2, "name": "fresh"}));
    let data = draft.save(attrs(json!({"name": "fresh"})), &CallOptions::new()).unwrap();

    let collection = paged.collection();
    collection.insert(0, collection.build_record(data));

    assert_eq!(paged.len(), 2);
    assert_eq!(paged.records()[0].key(), Some("2".into()));
    assert_eq!(paged.records()[1].key(), Some("1".into()));
}

#[test]
fn last_writer_wins_on_overlapping_page_fetches() {
    init_logs();
    let transport = Arc::new(MockTransport::new());
    let context = Arc::new(ClientContext::new(transport.clone()));
    let paged = PagedCollection::new(
        CollectionConfig::new().endpoint(Endpoint::new("apis")),
        context,
    );

    // Two fetches race; whichever response is applied last owns the
    // state. The mock serializes them, so the second response wins.
    transport.enqueue_ok(json!({"page": 1, "limit": 10, "total": 25, "data": [{"id": 1}]}));
    transport.enqueue_ok(json!({"page": 2, "limit": 10, "total": 30, "data": [{"id": 11}]}));
    paged.reload_page().unwrap();
    paged.load_page(2).unwrap();

    assert_eq!(paged.page(), 2);
    assert_eq!(paged.total(), 30);
    assert_eq!(paged.records()[0].key(), Some("11".into()));
}

#[test]
fn endpoint_placeholders_flow_through_collection_and_record() {
    init_logs();
    let transport = Arc::new(MockTransport::new());
    let context = Arc::new(ClientContext::new(transport.clone()));

    let paged = PagedCollection::new(
        CollectionConfig::new()
            .endpoint(Endpoint::new("apps/:app/keys").fixed("app", "mail"))
            .record(RecordConfig::new().endpoint(Endpoint::new("apps/:app/keys").fixed("app", "mail"))),
        context,
    );

    transport.enqueue_ok(json!({
        "page": 1, "limit": 10, "total": 1,
        "data": [{"id": 9}]
    }));
    paged.reload_page().unwrap();
    assert!(transport
        .last_request()
        .unwrap()
        .url
        .starts_with("/apps/mail/keys?"));

    transport.enqueue_ok(json!({"id": 9}));
    paged.records()[0].fetch(&CallOptions::new()).unwrap();
    assert_eq!(transport.last_request().unwrap().url, "/apps/mail/keys/9");
}
