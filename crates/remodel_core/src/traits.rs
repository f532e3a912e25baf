//! Capability traits shared by records and collections.
//!
//! Each capability is a separate trait implemented directly by the
//! concrete types, composed by implementation rather than by layering
//! prototypes at runtime.

use crate::context::ClientContext;
use crate::error::ClientResult;
use crate::notify::NotificationFeed;
use crate::page::PageInfo;
use remodel_endpoint::ResolveOptions;
use std::sync::Arc;

/// A resource that resolves its endpoint and reaches the remote source.
pub trait Syncable {
    /// The injected collaborator bundle.
    fn context(&self) -> &Arc<ClientContext>;

    /// Resolves the absolute URL for this resource.
    fn url(&self, options: &ResolveOptions) -> ClientResult<String>;

    /// The feed observers subscribe to.
    fn feed(&self) -> &NotificationFeed;
}

/// A typed back-link to the object that owns this one.
pub trait Parented {
    /// Type of the owning object.
    type Parent: ?Sized;

    /// Returns the owner, when one is set and still alive.
    fn parent(&self) -> Option<Arc<Self::Parent>>;
}

/// Server-paged state.
pub trait Paginated {
    /// Current page number, 1-based.
    fn page(&self) -> u64;

    /// Items per page.
    fn limit(&self) -> u64;

    /// Total item count, as last reported by the server.
    fn total(&self) -> u64;

    /// Derives pagination metadata from the current state.
    fn page_info(&self) -> PageInfo;
}
