//! Remote collections, plain and server-paged.

use crate::context::ClientContext;
use crate::error::{ClientError, ClientResult};
use crate::messages::{forward_failure_messages, forward_messages};
use crate::notify::{Notification, NotificationFeed};
use crate::page::PageInfo;
use crate::record::{Attributes, RecordConfig, RemoteRecord};
use crate::traits::{Paginated, Syncable};
use crate::transport::HttpRequest;
use parking_lot::RwLock;
use remodel_endpoint::{Endpoint, EndpointError, Filter, Order, QueryString, ResolveOptions};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::{error, info, warn};

/// Static configuration of a collection: its endpoint plus the record
/// configuration used for records spawned from response rows.
#[derive(Debug, Clone, Default)]
pub struct CollectionConfig {
    pub(crate) endpoint: Option<Endpoint>,
    pub(crate) record: RecordConfig,
}

impl CollectionConfig {
    /// Creates an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the collection endpoint template.
    pub fn endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    /// Sets the configuration for spawned records.
    pub fn record(mut self, record: RecordConfig) -> Self {
        self.record = record;
        self
    }
}

/// An ordered set of remote records.
///
/// Holds records in server order and refreshes them wholesale from
/// `data` rows of a listing response. Records added to a collection
/// get a typed back-link to it (see [`Parented`](crate::Parented)).
///
/// [`PagedCollection`] wraps one of these with server paging state;
/// use the plain collection for unpaged listings.
pub struct RemoteCollection {
    config: CollectionConfig,
    context: Arc<ClientContext>,
    records: RwLock<Vec<Arc<RemoteRecord>>>,
    feed: NotificationFeed,
    weak_self: Weak<RemoteCollection>,
}

impl RemoteCollection {
    /// Creates an empty collection handle.
    pub fn new(config: CollectionConfig, context: Arc<ClientContext>) -> Arc<Self> {
        Arc::new_cyclic(|weak_self| Self {
            config,
            context,
            records: RwLock::new(Vec::new()),
            feed: NotificationFeed::new(),
            weak_self: weak_self.clone(),
        })
    }

    /// Subscribes to this collection's notifications.
    pub fn subscribe(&self) -> std::sync::mpsc::Receiver<Notification> {
        self.feed.subscribe()
    }

    /// Returns a snapshot of the records in order.
    pub fn records(&self) -> Vec<Arc<RemoteRecord>> {
        self.records.read().clone()
    }

    /// Number of records currently held.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// True when no records are held.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Returns the record at `index`, if any.
    pub fn get(&self, index: usize) -> Option<Arc<RemoteRecord>> {
        self.records.read().get(index).cloned()
    }

    /// Returns the record with the given key, if present.
    pub fn find_by_key(&self, key: &str) -> Option<Arc<RemoteRecord>> {
        self.records
            .read()
            .iter()
            .find(|r| r.key().as_deref() == Some(key))
            .cloned()
    }

    /// Builds a record from row attributes using the configured record
    /// settings, without adding it.
    pub fn build_record(&self, attributes: Attributes) -> Arc<RemoteRecord> {
        Arc::new(RemoteRecord::with_attributes(
            self.config.record.clone(),
            Arc::clone(&self.context),
            attributes,
        ))
    }

    /// Appends a record and links it to this collection.
    pub fn add(&self, record: Arc<RemoteRecord>) {
        record.set_parent(self.weak_self.clone());
        self.records.write().push(record);
    }

    /// Inserts a record at `index` and links it to this collection.
    ///
    /// Indices past the end append.
    pub fn insert(&self, index: usize, record: Arc<RemoteRecord>) {
        record.set_parent(self.weak_self.clone());
        let mut records = self.records.write();
        let index = index.min(records.len());
        records.insert(index, record);
    }

    /// Removes the record with the given key, unlinking it.
    pub fn remove(&self, key: &str) -> Option<Arc<RemoteRecord>> {
        let mut records = self.records.write();
        let position = records.iter().position(|r| r.key().as_deref() == Some(key))?;
        let record = records.remove(position);
        record.clear_parent();
        Some(record)
    }

    /// Replaces all records with ones spawned from `rows`.
    pub fn replace_records(&self, rows: Vec<Attributes>) {
        let fresh: Vec<_> = rows.into_iter().map(|row| self.build_record(row)).collect();
        for record in &fresh {
            record.set_parent(self.weak_self.clone());
        }

        let old = {
            let mut records = self.records.write();
            std::mem::replace(&mut *records, fresh)
        };
        for record in &old {
            record.clear_parent();
        }

        self.feed.emit(Notification::RecordsReplaced { count: self.len() });
    }

    /// Extracts the record rows from a listing response.
    ///
    /// The generic shape is `{"data": [ {..}, {..} ]}`; paged listings
    /// extend it with paging fields read by [`PagedCollection`].
    pub fn parse(&self, body: &serde_json::Value) -> ClientResult<Vec<Attributes>> {
        let rows = body
            .get("data")
            .and_then(|d| d.as_array())
            .ok_or_else(|| ClientError::parse("listing body has no data array"))?;

        rows.iter()
            .map(|row| {
                row.as_object()
                    .cloned()
                    .ok_or_else(|| ClientError::parse("listing row is not a JSON object"))
            })
            .collect()
    }

    /// Fetches the full listing and replaces the records.
    pub fn fetch(&self) -> ClientResult<Vec<Arc<RemoteRecord>>> {
        self.feed.emit(Notification::Fetching);

        let url = self.resolve_url(&ResolveOptions::new())?;
        match self.context.transport().send(&HttpRequest::get(url)) {
            Ok(body) => {
                forward_messages(self.context.messages(), &body);
                let rows = self.parse(&body)?;
                self.replace_records(rows);
                Ok(self.records())
            }
            Err(failure) => {
                forward_failure_messages(self.context.messages(), &failure);
                self.feed.emit(Notification::FetchError {
                    failure: failure.clone(),
                });
                Err(ClientError::Transport(failure))
            }
        }
    }

    fn resolve_url(&self, options: &ResolveOptions) -> ClientResult<String> {
        let endpoint = self.config.endpoint.as_ref().ok_or_else(|| {
            error!("no endpoint specified for collection");
            ClientError::Endpoint(EndpointError::Missing)
        })?;

        let path = endpoint.resolve(options)?;
        Ok(self.context.base().join(&path))
    }
}

impl Syncable for RemoteCollection {
    fn context(&self) -> &Arc<ClientContext> {
        &self.context
    }

    fn url(&self, options: &ResolveOptions) -> ClientResult<String> {
        self.resolve_url(options)
    }

    fn feed(&self) -> &NotificationFeed {
        &self.feed
    }
}

impl fmt::Debug for RemoteCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteCollection")
            .field("endpoint", &self.config.endpoint)
            .field("len", &self.len())
            .finish()
    }
}

struct PageFields {
    page: u64,
    limit: u64,
    total: u64,
    filter: Filter,
    sort_by: String,
    order: Order,
    params: BTreeMap<String, String>,
}

/// A server-paged collection.
///
/// Wraps a [`RemoteCollection`] (sharing its record container and
/// notification feed) and tracks the paging request state: `page`,
/// `limit`, `filter`, `sort_by` and `order` are inputs the caller may
/// set before fetching, while `total`, `page` and `limit` are
/// overwritten from each paged response.
///
/// Changing the filter or sort does not reset `page`; callers go back
/// to page 1 themselves (or use [`apply_filter`](Self::apply_filter) /
/// [`apply_sort`](Self::apply_sort), which do it for them).
pub struct PagedCollection {
    inner: Arc<RemoteCollection>,
    state: RwLock<PageFields>,
}

impl PagedCollection {
    /// Creates a paged collection with page 1, a limit of 10 and no
    /// filter or sort.
    pub fn new(config: CollectionConfig, context: Arc<ClientContext>) -> Self {
        Self {
            inner: RemoteCollection::new(config, context),
            state: RwLock::new(PageFields {
                page: 1,
                limit: 10,
                total: 0,
                filter: Filter::new(),
                sort_by: String::new(),
                order: Order::Asc,
                params: BTreeMap::new(),
            }),
        }
    }

    /// The wrapped collection holding the records.
    pub fn collection(&self) -> &Arc<RemoteCollection> {
        &self.inner
    }

    /// Returns a snapshot of the current page's records in order.
    pub fn records(&self) -> Vec<Arc<RemoteRecord>> {
        self.inner.records()
    }

    /// Number of records on the current page.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// True when the current page holds no records.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Subscribes to this collection's notifications.
    pub fn subscribe(&self) -> std::sync::mpsc::Receiver<Notification> {
        self.inner.subscribe()
    }

    /// Sets the page for the next fetch.
    pub fn set_page(&self, page: u64) {
        self.state.write().page = page;
    }

    /// Sets the per-page limit for the next fetch.
    pub fn set_limit(&self, limit: u64) {
        self.state.write().limit = limit;
    }

    /// Returns the current filter.
    pub fn filter(&self) -> Filter {
        self.state.read().filter.clone()
    }

    /// Sets the filter for the next fetch. Does not touch `page`.
    pub fn set_filter(&self, filter: Filter) {
        self.state.write().filter = filter;
    }

    /// Returns the current sort field.
    pub fn sort_by(&self) -> String {
        self.state.read().sort_by.clone()
    }

    /// Sets the sort field for the next fetch. Does not touch `page`.
    pub fn set_sort_by(&self, sort_by: impl Into<String>) {
        self.state.write().sort_by = sort_by.into();
    }

    /// Returns the current sort direction.
    pub fn order(&self) -> Order {
        self.state.read().order
    }

    /// Sets the sort direction for the next fetch.
    pub fn set_order(&self, order: Order) {
        self.state.write().order = order;
    }

    /// Sets an extension query parameter sent with every fetch.
    ///
    /// An empty value is dropped from the query string like any other
    /// empty parameter.
    pub fn set_param(&self, name: impl Into<String>, value: impl Into<String>) {
        self.state.write().params.insert(name.into(), value.into());
    }

    /// Applies a new filter and fetches page 1.
    pub fn apply_filter(&self, filter: Filter) -> ClientResult<PageInfo> {
        {
            let mut state = self.state.write();
            state.filter = filter;
            state.page = 1;
        }
        self.do_fetch()
    }

    /// Applies a new sort and fetches page 1.
    pub fn apply_sort(&self, sort_by: impl Into<String>, order: Order) -> ClientResult<PageInfo> {
        {
            let mut state = self.state.write();
            state.sort_by = sort_by.into();
            state.order = order;
            state.page = 1;
        }
        self.do_fetch()
    }

    /// Builds the listing URL for the current state.
    ///
    /// Query parameters are `page`, `limit`, `filter`, `sortBy` and
    /// `order` plus any extension parameters; parameters with empty
    /// values are omitted entirely.
    pub fn url(&self) -> ClientResult<String> {
        self.page_url(&ResolveOptions::new())
    }

    /// Fetches the current page.
    ///
    /// Completion always goes through the page-load handlers: success
    /// updates `page`/`limit`/`total` from the response, replaces the
    /// records and emits `PageLoad`; any failure emits `PageLoadError`.
    /// Callers wanting to react subscribe to the feed.
    pub fn do_fetch(&self) -> ClientResult<PageInfo> {
        self.inner.feed.emit(Notification::Fetching);

        let url = self.url()?;
        match self.inner.context.transport().send(&HttpRequest::get(url)) {
            Ok(body) => {
                forward_messages(self.inner.context.messages(), &body);
                match self.parse_page(&body) {
                    Ok((page, limit, total, rows)) => {
                        {
                            let mut state = self.state.write();
                            state.page = page;
                            state.limit = limit;
                            state.total = total;
                        }
                        self.inner.replace_records(rows);
                        self.on_page_load()
                    }
                    Err(err) => {
                        self.on_page_load_error();
                        Err(err)
                    }
                }
            }
            Err(failure) => {
                forward_failure_messages(self.inner.context.messages(), &failure);
                self.inner.feed.emit(Notification::FetchError {
                    failure: failure.clone(),
                });
                self.on_page_load_error();
                Err(ClientError::Transport(failure))
            }
        }
    }

    /// Loads the next page, if there is one.
    ///
    /// At the last page this logs a warning and returns `Ok(None)`
    /// without mutating state or issuing a fetch.
    pub fn next_page(&self) -> ClientResult<Option<PageInfo>> {
        let info = self.page_info();
        if info.next.is_none() {
            warn!(page = info.page, "already at the last page");
            return Ok(None);
        }

        self.state.write().page += 1;
        self.do_fetch().map(Some)
    }

    /// Loads the previous page, if there is one.
    pub fn previous_page(&self) -> ClientResult<Option<PageInfo>> {
        {
            let mut state = self.state.write();
            if state.page <= 1 {
                warn!(page = state.page, "already at the first page");
                return Ok(None);
            }
            state.page -= 1;
        }
        self.do_fetch().map(Some)
    }

    /// Jumps to `page` and fetches it.
    ///
    /// No bounds check is made; requesting a page past the end is the
    /// caller's responsibility.
    pub fn load_page(&self, page: u64) -> ClientResult<PageInfo> {
        self.state.write().page = page;
        self.do_fetch()
    }

    /// Refetches the current page with unchanged state.
    pub fn reload_page(&self) -> ClientResult<PageInfo> {
        self.do_fetch()
    }

    fn on_page_load(&self) -> ClientResult<PageInfo> {
        let info = self.page_info();
        info!(page = info.page, total = info.total, "page loaded");
        self.inner.feed.emit(Notification::PageLoad { info: info.clone() });
        Ok(info)
    }

    fn on_page_load_error(&self) {
        warn!(page = self.page(), "page cannot be loaded");
        self.inner.feed.emit(Notification::PageLoadError);
    }

    fn page_url(&self, options: &ResolveOptions) -> ClientResult<String> {
        let base = self.inner.resolve_url(options)?;

        let state = self.state.read();
        let mut query = QueryString::new()
            .pair("page", state.page.to_string())
            .pair("limit", state.limit.to_string())
            .pair("filter", state.filter.encode())
            .pair("sortBy", state.sort_by.clone())
            .pair("order", state.order.as_str());
        for (name, value) in &state.params {
            query.set(name.clone(), value.clone());
        }

        Ok(query.append_to(&base))
    }

    /// Reads the paging fields and record rows from a paged response.
    ///
    /// The records-only parse of [`RemoteCollection`] is not enough for
    /// a paged listing: `page`, `limit` and `total` are required here
    /// and accepted as JSON numbers or numeric strings.
    fn parse_page(
        &self,
        body: &serde_json::Value,
    ) -> ClientResult<(u64, u64, u64, Vec<Attributes>)> {
        let page = read_count(body, "page")?;
        let limit = read_count(body, "limit")?;
        let total = read_count(body, "total")?;
        let rows = self.inner.parse(body)?;
        Ok((page, limit, total, rows))
    }
}

impl Paginated for PagedCollection {
    fn page(&self) -> u64 {
        self.state.read().page
    }

    fn limit(&self) -> u64 {
        self.state.read().limit
    }

    fn total(&self) -> u64 {
        self.state.read().total
    }

    /// Derives pagination metadata from the stored state.
    ///
    /// A stored limit of 0 is normalized to 10 first, as an observable
    /// side effect on the collection.
    fn page_info(&self) -> PageInfo {
        let mut state = self.state.write();
        if state.limit == 0 {
            state.limit = 10;
        }
        PageInfo::compute(state.total, state.page, state.limit)
    }
}

impl Syncable for PagedCollection {
    fn context(&self) -> &Arc<ClientContext> {
        &self.inner.context
    }

    fn url(&self, options: &ResolveOptions) -> ClientResult<String> {
        self.page_url(options)
    }

    fn feed(&self) -> &NotificationFeed {
        &self.inner.feed
    }
}

impl fmt::Debug for PagedCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("PagedCollection")
            .field("page", &state.page)
            .field("limit", &state.limit)
            .field("total", &state.total)
            .field("len", &self.inner.len())
            .finish()
    }
}

fn read_count(body: &serde_json::Value, field: &str) -> ClientResult<u64> {
    match body.get(field) {
        Some(serde_json::Value::Number(n)) => n
            .as_u64()
            .ok_or_else(|| ClientError::parse(format!("{field} is not a non-negative integer"))),
        Some(serde_json::Value::String(s)) => s
            .parse()
            .map_err(|_| ClientError::parse(format!("{field} is not a non-negative integer"))),
        _ => Err(ClientError::parse(format!("paged body is missing {field}"))),
    }
}
