//! Remote records and their synchronization protocol.

use crate::collection::RemoteCollection;
use crate::context::ClientContext;
use crate::error::{ClientError, ClientResult};
use crate::messages::{forward_failure_messages, forward_messages};
use crate::notify::{Notification, NotificationFeed};
use crate::traits::{Parented, Syncable};
use crate::transport::{HttpRequest, Method};
use parking_lot::RwLock;
use remodel_endpoint::{Endpoint, EndpointError, ResolveOptions};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::{error, warn};

/// Field map of a record: JSON field names to values.
pub type Attributes = serde_json::Map<String, serde_json::Value>;

/// A function turning a raw response body into record attributes.
pub type ParseFn = Arc<dyn Fn(&serde_json::Value) -> ClientResult<Attributes> + Send + Sync>;

/// Static configuration of a record: endpoint, key field, defaults,
/// transmitted-field allow-list, busy policy and parse step.
#[derive(Clone)]
pub struct RecordConfig {
    pub(crate) endpoint: Option<Endpoint>,
    pub(crate) key_field: String,
    pub(crate) defaults: Attributes,
    pub(crate) persistent: Option<BTreeSet<String>>,
    pub(crate) ignore_when_processing: bool,
    pub(crate) parser: Option<ParseFn>,
}

impl RecordConfig {
    /// Creates a configuration with the `"id"` key field, no defaults
    /// and the drop-overlapping-saves policy enabled.
    pub fn new() -> Self {
        Self {
            endpoint: None,
            key_field: "id".into(),
            defaults: Attributes::new(),
            persistent: None,
            ignore_when_processing: true,
            parser: None,
        }
    }

    /// Sets the endpoint template.
    pub fn endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    /// Sets the field holding the identifying key.
    pub fn key_field(mut self, field: impl Into<String>) -> Self {
        self.key_field = field.into();
        self
    }

    /// Adds a default attribute value, re-applied by `clear`.
    pub fn default_value(mut self, field: impl Into<String>, value: serde_json::Value) -> Self {
        self.defaults.insert(field.into(), value);
        self
    }

    /// Restricts which fields `save` transmits.
    pub fn persistent<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.persistent = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Sets whether an overlapping save is dropped (true, the default)
    /// or allowed through.
    pub fn ignore_when_processing(mut self, ignore: bool) -> Self {
        self.ignore_when_processing = ignore;
        self
    }

    /// Replaces the default parse step for this record.
    pub fn parser(
        mut self,
        parser: impl Fn(&serde_json::Value) -> ClientResult<Attributes> + Send + Sync + 'static,
    ) -> Self {
        self.parser = Some(Arc::new(parser));
        self
    }
}

impl Default for RecordConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RecordConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordConfig")
            .field("endpoint", &self.endpoint)
            .field("key_field", &self.key_field)
            .field("defaults", &self.defaults)
            .field("persistent", &self.persistent)
            .field("ignore_when_processing", &self.ignore_when_processing)
            .field("has_parser", &self.parser.is_some())
            .finish()
    }
}

/// Per-call options for fetch/save/destroy.
#[derive(Default, Clone)]
pub struct CallOptions {
    pub(crate) endpoint: Option<Endpoint>,
    pub(crate) resolve: ResolveOptions,
    pub(crate) parser: Option<ParseFn>,
}

impl CallOptions {
    /// Creates empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the record's endpoint for this call.
    pub fn endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    /// Sets the per-request resolve options.
    pub fn resolve(mut self, resolve: ResolveOptions) -> Self {
        self.resolve = resolve;
        self
    }

    /// Overrides the parse step for this call.
    pub fn parser(
        mut self,
        parser: impl Fn(&serde_json::Value) -> ClientResult<Attributes> + Send + Sync + 'static,
    ) -> Self {
        self.parser = Some(Arc::new(parser));
        self
    }
}

impl fmt::Debug for CallOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallOptions")
            .field("endpoint", &self.endpoint)
            .field("resolve", &self.resolve)
            .field("has_parser", &self.parser.is_some())
            .finish()
    }
}

/// Options for an ad hoc record action.
#[derive(Default, Clone)]
pub struct ActionOptions {
    pub(crate) method: Option<Method>,
    pub(crate) body: Option<serde_json::Value>,
    pub(crate) call: CallOptions,
}

impl ActionOptions {
    /// Creates options with the default PUT method and no body.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the HTTP method.
    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Sets the JSON body.
    pub fn body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Sets the endpoint/resolve options used to build the record URL.
    pub fn call(mut self, call: CallOptions) -> Self {
        self.call = call;
        self
    }
}

struct RecordState {
    attributes: Attributes,
    backups: Attributes,
    processing: bool,
}

/// One persisted record of a remote resource.
///
/// Live attributes are edited locally with [`set`](Self::set); the
/// synced snapshot ("backups") tracks the last state confirmed by the
/// remote source and is only ever replaced by response data. `reset`
/// reverts the live state to the snapshot. Writes go through a
/// processing guard: while one save is in flight, further saves are
/// rejected with [`ClientError::Busy`] rather than queued.
///
/// All methods take `&self`; state lives behind a lock that is never
/// held across a transport call, so a record can be shared and driven
/// from completion paths of other operations.
pub struct RemoteRecord {
    config: RecordConfig,
    context: Arc<ClientContext>,
    state: RwLock<RecordState>,
    feed: NotificationFeed,
    parent: RwLock<Weak<RemoteCollection>>,
}

impl RemoteRecord {
    /// Creates an empty record.
    ///
    /// Defaults from the configuration become the live attributes; the
    /// snapshot starts empty.
    pub fn new(config: RecordConfig, context: Arc<ClientContext>) -> Self {
        Self::with_attributes(config, context, Attributes::new())
    }

    /// Creates a record seeded with attributes.
    ///
    /// The live state is the configured defaults overlaid with
    /// `attributes`; the seed itself becomes the initial snapshot.
    pub fn with_attributes(
        config: RecordConfig,
        context: Arc<ClientContext>,
        attributes: Attributes,
    ) -> Self {
        let mut live = config.defaults.clone();
        live.extend(attributes.clone());

        Self {
            config,
            context,
            state: RwLock::new(RecordState {
                attributes: live,
                backups: attributes,
                processing: false,
            }),
            feed: NotificationFeed::new(),
            parent: RwLock::new(Weak::new()),
        }
    }

    /// Returns one attribute value.
    pub fn get(&self, field: &str) -> Option<serde_json::Value> {
        self.state.read().attributes.get(field).cloned()
    }

    /// Sets one attribute locally.
    pub fn set(&self, field: impl Into<String>, value: serde_json::Value) {
        self.state.write().attributes.insert(field.into(), value);
    }

    /// Sets several attributes locally.
    pub fn set_many(&self, attributes: Attributes) {
        self.state.write().attributes.extend(attributes);
    }

    /// Sets attributes as already in sync with the remote source:
    /// both the live state and the snapshot are updated.
    pub fn set_synced(&self, attributes: Attributes) {
        let mut state = self.state.write();
        state.attributes.extend(attributes.clone());
        state.backups.extend(attributes);
    }

    /// Removes one attribute locally.
    pub fn unset(&self, field: &str) {
        self.state.write().attributes.remove(field);
    }

    /// Returns a copy of the live attributes.
    pub fn attributes(&self) -> Attributes {
        self.state.read().attributes.clone()
    }

    /// Returns a copy of the synced snapshot.
    pub fn backups(&self) -> Attributes {
        self.state.read().backups.clone()
    }

    /// Replaces the synced snapshot.
    pub fn set_backups(&self, attributes: Attributes) {
        self.state.write().backups = attributes;
    }

    /// Returns the identifying key, when the record has one.
    pub fn key(&self) -> Option<String> {
        let state = self.state.read();
        match state.attributes.get(&self.config.key_field) {
            Some(serde_json::Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(serde_json::Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    }

    /// True until the record has an identifying key.
    pub fn is_new(&self) -> bool {
        self.key().is_none()
    }

    /// True while a write is in flight.
    pub fn processing(&self) -> bool {
        self.state.read().processing
    }

    /// Subscribes to this record's notifications.
    pub fn subscribe(&self) -> std::sync::mpsc::Receiver<Notification> {
        self.feed.subscribe()
    }

    /// Reverts the live attributes to the synced snapshot.
    ///
    /// Attributes added locally since the last sync are removed and
    /// snapshot values are restored, so afterwards the live state
    /// equals the snapshot exactly. Idempotent.
    pub fn reset(&self) {
        let mut state = self.state.write();
        state.attributes = state.backups.clone();
    }

    /// Wipes all attributes and re-applies the configured defaults.
    ///
    /// The snapshot is left untouched; use [`reset`](Self::reset) to
    /// return to the synced state instead.
    pub fn clear(&self) {
        self.state.write().attributes = self.config.defaults.clone();
    }

    /// Reads the record from the remote source.
    ///
    /// On success the parsed response replaces both the snapshot and
    /// the live attributes: a fetch is an authoritative overwrite, not
    /// a merge.
    pub fn fetch(&self, options: &CallOptions) -> ClientResult<Attributes> {
        self.feed.emit(Notification::Fetching);

        let url = self.resolve_url(options)?;
        match self.context.transport().send(&HttpRequest::get(url)) {
            Ok(body) => {
                forward_messages(self.context.messages(), &body);
                let data = self.parse(&body, options)?;

                let previous = {
                    let mut state = self.state.write();
                    let previous = std::mem::replace(&mut state.attributes, data.clone());
                    state.backups = data.clone();
                    previous
                };

                self.feed.emit(Notification::Fetched {
                    previous,
                    current: data.clone(),
                });
                Ok(data)
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

    /// Writes the record to the remote source.
    ///
    /// `attributes` are merged into the live state first. A record
    /// without a key is created with POST against the collection URL;
    /// a persisted record is updated with PUT against its own URL.
    /// When a `persistent` allow-list is configured, only those fields
    /// are transmitted.
    ///
    /// While another save is in flight this call is rejected with
    /// [`ClientError::Busy`] (it does not queue, retry or clear the
    /// guard), unless the policy was disabled in the configuration.
    pub fn save(&self, attributes: Attributes, options: &CallOptions) -> ClientResult<Attributes> {
        {
            let mut state = self.state.write();
            if state.processing && self.config.ignore_when_processing {
                warn!("save ignored, another request is still in progress");
                return Err(ClientError::Busy);
            }
            state.processing = true;
            state.attributes.extend(attributes);
        }

        self.feed.emit(Notification::Processing { active: true });
        self.feed.emit(Notification::Saving);

        let request = match self.build_save_request(options) {
            Ok(request) => request,
            Err(err) => {
                self.finish_processing();
                return Err(err);
            }
        };

        match self.context.transport().send(&request) {
            Ok(body) => {
                forward_messages(self.context.messages(), &body);
                let data = match self.parse(&body, options) {
                    Ok(data) => data,
                    Err(err) => {
                        self.finish_processing();
                        return Err(err);
                    }
                };

                {
                    let mut state = self.state.write();
                    state.attributes.extend(data.clone());
                    state.backups = data.clone();
                    state.processing = false;
                }

                self.feed.emit(Notification::Processing { active: false });
                self.feed.emit(Notification::Saved { data: data.clone() });
                Ok(data)
            }
            Err(failure) => {
                forward_failure_messages(self.context.messages(), &failure);
                self.finish_processing();
                self.feed.emit(Notification::SaveError {
                    failure: failure.clone(),
                });
                Err(ClientError::Transport(failure))
            }
        }
    }

    /// Deletes the record from the remote source.
    ///
    /// A record that was never persisted is finished locally: the
    /// snapshot is cleared and `Deleted` is emitted without a transport
    /// call. Otherwise the record stays untouched until the server
    /// confirms; on success the snapshot becomes the residual data the
    /// server returned (usually empty).
    pub fn destroy(&self, options: &CallOptions) -> ClientResult<Attributes> {
        self.feed.emit(Notification::Deleting);

        if self.is_new() {
            let data = Attributes::new();
            self.state.write().backups = data.clone();
            self.feed.emit(Notification::Deleted { data: data.clone() });
            return Ok(data);
        }

        let url = self.resolve_url(options)?;
        match self.context.transport().send(&HttpRequest::delete(url)) {
            Ok(body) => {
                forward_messages(self.context.messages(), &body);
                let data = body.as_object().map(strip_envelope).unwrap_or_default();

                self.state.write().backups = data.clone();
                self.feed.emit(Notification::Deleted { data: data.clone() });
                Ok(data)
            }
            Err(failure) => {
                forward_failure_messages(self.context.messages(), &failure);
                self.feed.emit(Notification::DeleteError {
                    failure: failure.clone(),
                });
                Err(ClientError::Transport(failure))
            }
        }
    }

    /// Performs an ad hoc call against this record.
    ///
    /// A bare `name` addresses `<record url>/<name>`; a name containing
    /// a `/` is used as the complete URL. The method defaults to PUT.
    /// Messages in the response are forwarded as usual; the raw body is
    /// returned and neither the snapshot nor the processing guard is
    /// touched.
    pub fn action(&self, name: &str, options: &ActionOptions) -> ClientResult<serde_json::Value> {
        let url = if name.contains('/') {
            name.to_string()
        } else {
            format!("{}/{}", self.resolve_url(&options.call)?, name)
        };

        let request = HttpRequest {
            url,
            method: options.method.unwrap_or(Method::Put),
            body: options.body.clone(),
        };

        match self.context.transport().send(&request) {
            Ok(body) => {
                forward_messages(self.context.messages(), &body);
                Ok(body)
            }
            Err(failure) => {
                forward_failure_messages(self.context.messages(), &failure);
                Err(ClientError::Transport(failure))
            }
        }
    }

    fn resolve_url(&self, options: &CallOptions) -> ClientResult<String> {
        let endpoint = options
            .endpoint
            .as_ref()
            .or(self.config.endpoint.as_ref())
            .ok_or_else(|| {
                error!("no endpoint specified for record");
                ClientError::Endpoint(EndpointError::Missing)
            })?;

        let key = self.key();
        let path = endpoint.resolve_for_key(key.as_deref(), &options.resolve)?;
        Ok(self.context.base().join(&path))
    }

    fn build_save_request(&self, options: &CallOptions) -> ClientResult<HttpRequest> {
        let url = self.resolve_url(options)?;

        let body = {
            let state = self.state.read();
            let mut body = state.attributes.clone();
            if let Some(persistent) = &self.config.persistent {
                body.retain(|field, _| persistent.contains(field));
            }
            serde_json::Value::Object(body)
        };

        if self.is_new() {
            Ok(HttpRequest::post(url, body))
        } else {
            Ok(HttpRequest::put(url, body))
        }
    }

    fn finish_processing(&self) {
        self.state.write().processing = false;
        self.feed.emit(Notification::Processing { active: false });
    }

    fn parse(&self, body: &serde_json::Value, options: &CallOptions) -> ClientResult<Attributes> {
        let parser = options.parser.as_ref().or(self.config.parser.as_ref());
        match parser {
            Some(parser) => parser(body),
            None => body
                .as_object()
                .map(strip_envelope)
                .ok_or_else(|| ClientError::parse("record body is not a JSON object")),
        }
    }

    pub(crate) fn set_parent(&self, collection: Weak<RemoteCollection>) {
        *self.parent.write() = collection;
    }

    pub(crate) fn clear_parent(&self) {
        *self.parent.write() = Weak::new();
    }
}

/// Drops the reserved message envelope from record data.
///
/// `messages` travels alongside entity fields in response bodies; it is
/// forwarded to the message sink and must not end up in attributes or
/// the synced snapshot.
fn strip_envelope(object: &Attributes) -> Attributes {
    let mut data = object.clone();
    data.remove(crate::messages::MESSAGES_FIELD);
    data
}

impl Syncable for RemoteRecord {
    fn context(&self) -> &Arc<ClientContext> {
        &self.context
    }

    fn url(&self, options: &ResolveOptions) -> ClientResult<String> {
        self.resolve_url(&CallOptions::new().resolve(options.clone()))
    }

    fn feed(&self) -> &NotificationFeed {
        &self.feed
    }
}

impl Parented for RemoteRecord {
    type Parent = RemoteCollection;

    fn parent(&self) -> Option<Arc<RemoteCollection>> {
        self.parent.read().upgrade()
    }
}

impl fmt::Debug for RemoteRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("RemoteRecord")
            .field("key", &state.attributes.get(&self.config.key_field))
            .field("attributes", &state.attributes)
            .field("processing", &state.processing)
            .finish()
    }
}
