//! # remodel core
//!
//! Client runtime for CRUD-style remote resources.
//!
//! This crate provides:
//! - `RemoteRecord`: one persisted record with a synced-snapshot
//!   protocol (fetch/save/destroy/reset) and an at-most-one-in-flight
//!   write guard
//! - `RemoteCollection` and `PagedCollection`: ordered record sets, the
//!   paged variant tracking page/limit/filter/sort/total against a
//!   server-paged listing
//! - `PageInfo`: derived pagination metadata
//! - a typed [`Notification`] feed instead of ad hoc string events
//! - collaborator seams: [`HttpTransport`] and [`MessageSink`], with
//!   mock implementations for tests
//! - [`ClientContext`]: the explicitly injected collaborator bundle
//!
//! ## Key invariants
//!
//! - A record's snapshot is only replaced by data that arrived from the
//!   remote source, never by local edits
//! - At most one write per record is in flight; overlapping saves are
//!   rejected with a typed busy error, not queued
//! - `total`, `page` and `limit` on a paged collection are overwritten
//!   only by response parsing
//! - Transport errors never propagate as panics; they surface as
//!   `*Error` notifications and `ClientError` values

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod collection;
mod context;
mod error;
mod messages;
mod notify;
mod page;
mod record;
mod traits;
mod transport;

pub use collection::{CollectionConfig, PagedCollection, RemoteCollection};
pub use context::ClientContext;
pub use error::{ClientError, ClientResult, TransportFailure};
pub use messages::{LogSink, MessageSink, RecordingSink};
pub use notify::{Notification, NotificationFeed, NotificationKind};
pub use page::PageInfo;
pub use record::{ActionOptions, Attributes, CallOptions, ParseFn, RecordConfig, RemoteRecord};
pub use traits::{Paginated, Parented, Syncable};
pub use transport::{HttpRequest, HttpTransport, Method, MockTransport};

pub use remodel_endpoint::{
    BaseUrl, Endpoint, EndpointError, Filter, FilterTerm, Order, QueryString, ResolveOptions,
};
