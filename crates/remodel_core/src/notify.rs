//! Typed operation notifications.
//!
//! Records and collections publish their lifecycle through a
//! [`NotificationFeed`] instead of ad hoc string-named events. Every
//! kind carries its payload in the variant, so subscribers match on an
//! enum rather than parsing event names and untyped argument lists.

use crate::error::TransportFailure;
use crate::page::PageInfo;
use crate::record::Attributes;
use parking_lot::RwLock;
use std::sync::mpsc::{self, Receiver, Sender};

/// One lifecycle notification from a record or collection.
#[derive(Debug, Clone)]
pub enum Notification {
    /// A read has been issued.
    Fetching,
    /// A record read completed; carries the attributes before and after
    /// the authoritative overwrite.
    Fetched {
        /// Live attributes before the fetch.
        previous: Attributes,
        /// Parsed attributes now live and snapshotted.
        current: Attributes,
    },
    /// A read failed.
    FetchError {
        /// What the transport could recover.
        failure: TransportFailure,
    },
    /// A write has been issued.
    Saving,
    /// A write completed.
    Saved {
        /// Parsed response data, now the synced snapshot.
        data: Attributes,
    },
    /// A write failed.
    SaveError {
        /// What the transport could recover.
        failure: TransportFailure,
    },
    /// The in-flight-write guard changed.
    Processing {
        /// True between write issue and completion.
        active: bool,
    },
    /// A delete has been issued.
    Deleting,
    /// A delete completed.
    Deleted {
        /// Residual data returned by the server, usually empty.
        data: Attributes,
    },
    /// A delete failed.
    DeleteError {
        /// What the transport could recover.
        failure: TransportFailure,
    },
    /// A collection replaced its records from a response.
    RecordsReplaced {
        /// Number of records now held.
        count: usize,
    },
    /// A page fetch completed and the paging state was updated.
    PageLoad {
        /// Pagination metadata derived from the new state.
        info: PageInfo,
    },
    /// A page fetch failed; the paging state is unchanged.
    PageLoadError,
}

impl Notification {
    /// Returns the kind of this notification.
    pub fn kind(&self) -> NotificationKind {
        match self {
            Notification::Fetching => NotificationKind::Fetching,
            Notification::Fetched { .. } => NotificationKind::Fetched,
            Notification::FetchError { .. } => NotificationKind::FetchError,
            Notification::Saving => NotificationKind::Saving,
            Notification::Saved { .. } => NotificationKind::Saved,
            Notification::SaveError { .. } => NotificationKind::SaveError,
            Notification::Processing { .. } => NotificationKind::Processing,
            Notification::Deleting => NotificationKind::Deleting,
            Notification::Deleted { .. } => NotificationKind::Deleted,
            Notification::DeleteError { .. } => NotificationKind::DeleteError,
            Notification::RecordsReplaced { .. } => NotificationKind::RecordsReplaced,
            Notification::PageLoad { .. } => NotificationKind::PageLoad,
            Notification::PageLoadError => NotificationKind::PageLoadError,
        }
    }
}

/// Discriminant of a [`Notification`], for filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum NotificationKind {
    Fetching,
    Fetched,
    FetchError,
    Saving,
    Saved,
    SaveError,
    Processing,
    Deleting,
    Deleted,
    DeleteError,
    RecordsReplaced,
    PageLoad,
    PageLoadError,
}

/// Distributes notifications to subscribers.
///
/// Every record and collection owns one feed. Subscribers receive all
/// notifications emitted after they subscribe, in emission order;
/// disconnected subscribers are dropped on the next emit.
pub struct NotificationFeed {
    subscribers: RwLock<Vec<Sender<Notification>>>,
}

impl NotificationFeed {
    /// Creates a feed with no subscribers.
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
        }
    }

    /// Subscribes to the feed.
    pub fn subscribe(&self) -> Receiver<Notification> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.write().push(tx);
        rx
    }

    /// Emits a notification to all subscribers.
    pub fn emit(&self, notification: Notification) {
        let mut subscribers = self.subscribers.write();
        subscribers.retain(|tx| tx.send(notification.clone()).is_ok());
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }
}

impl Default for NotificationFeed {
    fn default() -> Self {
        Self::new()
    }
}
