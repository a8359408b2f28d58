//! Port interfaces for calendar synchronization
//!
//! These traits define the boundaries between the reconciliation core and
//! the infrastructure that talks to Exchange or disk.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use roomsync_domain::{
    AttachmentRef, ItemIdentity, ItemRecord, LifecycleEvent, NewCalendarItem, Result, TimeWindow,
};

use super::store::CalendarWindowStore;

/// Items fetched for one mailbox as part of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailboxSnapshot {
    pub mailbox: String,
    pub items: Vec<ItemRecord>,
}

/// Remote calendar access (fetching and mutations)
///
/// Transport, authentication and protocol failures surface as
/// `RoomSyncError::Network`, `Auth`, `Protocol` or `Conflict`. The core never
/// retries.
#[async_trait]
pub trait CalendarGateway: Send + Sync {
    /// Fetch every item overlapping `window` on `mailbox`'s calendar.
    async fn fetch_snapshot(&self, mailbox: &str, window: &TimeWindow) -> Result<Vec<ItemRecord>>;

    /// Fetch several mailboxes at once.
    ///
    /// The default implementation fetches them one by one. Gateways that can
    /// query several folders in a single request override this.
    async fn fetch_snapshots(
        &self,
        mailboxes: &[String],
        window: &TimeWindow,
    ) -> Result<Vec<MailboxSnapshot>> {
        let mut snapshots = Vec::with_capacity(mailboxes.len());
        for mailbox in mailboxes {
            let items = self.fetch_snapshot(mailbox, window).await?;
            snapshots.push(MailboxSnapshot { mailbox: mailbox.clone(), items });
        }
        Ok(snapshots)
    }

    /// Create a new item on `mailbox`'s calendar.
    async fn create_item(&self, mailbox: &str, item: &NewCalendarItem) -> Result<()>;

    /// Move the start and/or end of an item.
    async fn change_item_time(
        &self,
        mailbox: &str,
        identity: &ItemIdentity,
        new_start: Option<DateTime<Utc>>,
        new_end: Option<DateTime<Utc>>,
    ) -> Result<()>;

    /// Replace an item's body.
    async fn change_item_body(
        &self,
        mailbox: &str,
        identity: &ItemIdentity,
        body: &str,
    ) -> Result<()>;

    /// Delete an item.
    async fn delete_item(&self, mailbox: &str, identity: &ItemIdentity) -> Result<()>;

    /// Unique attendee addresses, sorted.
    async fn get_attendees(&self, mailbox: &str, identity: &ItemIdentity) -> Result<Vec<String>>;

    /// Add then remove attendees.
    async fn change_attendees(
        &self,
        mailbox: &str,
        identity: &ItemIdentity,
        add: &[String],
        remove: &[String],
    ) -> Result<()>;

    /// Attachment ids and names (never content).
    async fn list_attachments(
        &self,
        mailbox: &str,
        identity: &ItemIdentity,
    ) -> Result<Vec<AttachmentRef>>;
}

/// Durable storage for mailbox stores between restarts
#[async_trait]
pub trait CalendarStoreRepository: Send + Sync {
    /// Load a previously saved store, `None` if there is none.
    async fn load(&self, mailbox: &str) -> Result<Option<CalendarWindowStore>>;

    /// Save a store, replacing any previous state for its mailbox.
    async fn save(&self, store: &CalendarWindowStore) -> Result<()>;
}

/// Receives lifecycle events after each successful reconciliation
#[async_trait]
pub trait CalendarEventSink: Send + Sync {
    async fn notify(&self, mailbox: &str, events: &[LifecycleEvent]);
}
