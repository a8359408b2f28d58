//! Calendar sync service - orchestrates fetch, reconcile, persist, notify

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use roomsync_domain::{
    normalize_mailbox, AttachmentRef, CalendarError, ItemIdentity, ItemRecord, LifecycleEvent,
    NewCalendarItem, Result, RoomSyncError, SyncConfig, TimeWindow,
};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument, warn};

use super::ports::{CalendarEventSink, CalendarGateway, CalendarStoreRepository, MailboxSnapshot};
use super::reconcile::{reconcile, ReconcileSummary};
use super::store::CalendarWindowStore;

type SharedStore = Arc<Mutex<CalendarWindowStore>>;

/// Outcome of [`CalendarSyncService::update_calendars`].
///
/// A mailbox appears in exactly one of the two maps. Failed mailboxes keep
/// their previous store, so their events are reported by a later update.
#[derive(Debug, Default)]
pub struct BatchUpdate {
    pub events: HashMap<String, Vec<LifecycleEvent>>,
    pub failures: HashMap<String, RoomSyncError>,
}

impl BatchUpdate {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Keeps one [`CalendarWindowStore`] per mailbox in sync with the gateway.
///
/// Reconciliations for the same mailbox are serialized by a per-store mutex;
/// different mailboxes proceed independently.
pub struct CalendarSyncService {
    gateway: Arc<dyn CalendarGateway>,
    repository: Option<Arc<dyn CalendarStoreRepository>>,
    sink: Option<Arc<dyn CalendarEventSink>>,
    settings: SyncConfig,
    stores: RwLock<HashMap<String, SharedStore>>,
}

impl CalendarSyncService {
    /// Create a new sync service
    pub fn new(gateway: Arc<dyn CalendarGateway>, settings: SyncConfig) -> Self {
        Self { gateway, repository: None, sink: None, settings, stores: RwLock::new(HashMap::new()) }
    }

    /// Load stores on first use and save them after every reconciliation.
    pub fn with_repository(mut self, repository: Arc<dyn CalendarStoreRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    /// Forward lifecycle events to a listener.
    pub fn with_sink(mut self, sink: Arc<dyn CalendarEventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Fetch and reconcile one mailbox.
    ///
    /// `None` uses the configured lookback/lookahead around now.
    #[instrument(skip(self))]
    pub async fn update_calendar(
        &self,
        mailbox: &str,
        window: Option<TimeWindow>,
    ) -> Result<Vec<LifecycleEvent>> {
        let key = normalize_mailbox(mailbox);
        let window = window.unwrap_or_else(|| self.settings.default_window(Utc::now()));
        let store = self.store_for(&key).await?;

        let events = {
            let mut guard = store.lock().await;
            let snapshot = self.gateway.fetch_snapshot(&key, &window).await?;
            self.commit(&mut guard, &window, snapshot).await?
        };

        self.publish(&key, &events).await;
        Ok(events)
    }

    /// Fetch several mailboxes in one gateway call and reconcile each.
    ///
    /// Mailboxes the gateway did not report on are skipped, since an absent
    /// snapshot is not authoritative. A mailbox that fails to reconcile or
    /// save lands in [`BatchUpdate::failures`]; the others are unaffected.
    ///
    /// # Errors
    /// Only a failure of the batch fetch itself is returned as `Err`.
    #[instrument(skip(self, mailboxes), fields(count = mailboxes.len()))]
    pub async fn update_calendars(
        &self,
        mailboxes: &[String],
        window: Option<TimeWindow>,
    ) -> Result<BatchUpdate> {
        let mut keys: Vec<String> = mailboxes.iter().map(|m| normalize_mailbox(m)).collect();
        keys.sort();
        keys.dedup();

        let window = window.unwrap_or_else(|| self.settings.default_window(Utc::now()));
        let snapshots = self.gateway.fetch_snapshots(&keys, &window).await?;
        let mut by_mailbox: HashMap<String, Vec<ItemRecord>> = snapshots
            .into_iter()
            .map(|MailboxSnapshot { mailbox, items }| (normalize_mailbox(&mailbox), items))
            .collect();

        let mut jobs = Vec::new();
        for key in keys {
            match by_mailbox.remove(&key) {
                Some(items) => jobs.push(self.reconcile_fetched(key, window, items)),
                None => warn!(mailbox = %key, "gateway returned no snapshot; skipping mailbox"),
            }
        }

        let mut batch = BatchUpdate::default();
        for (key, outcome) in join_all(jobs).await {
            match outcome {
                Ok(events) => {
                    batch.events.insert(key, events);
                }
                Err(err) => {
                    warn!(mailbox = %key, error = %err, "mailbox update failed");
                    batch.failures.insert(key, err);
                }
            }
        }

        info!(
            updated = batch.events.len(),
            failed = batch.failures.len(),
            "batch calendar update completed"
        );
        Ok(batch)
    }

    /// Items happening at `now`.
    pub async fn items_now(&self, mailbox: &str, now: DateTime<Utc>) -> Result<Vec<ItemRecord>> {
        let store = self.store_for(&normalize_mailbox(mailbox)).await?;
        let guard = store.lock().await;
        Ok(guard.items_overlapping(now).cloned().collect())
    }

    /// Items overlapping `[start, end]`.
    pub async fn items_in_range(
        &self,
        mailbox: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ItemRecord>> {
        let store = self.store_for(&normalize_mailbox(mailbox)).await?;
        let guard = store.lock().await;
        Ok(guard.items_in_range(start, end)?.cloned().collect())
    }

    pub async fn get_item(&self, mailbox: &str, item_id: &str) -> Result<Option<ItemRecord>> {
        let store = self.store_for(&normalize_mailbox(mailbox)).await?;
        let guard = store.lock().await;
        Ok(guard.get(item_id).cloned())
    }

    pub async fn covered_window(&self, mailbox: &str) -> Result<Option<TimeWindow>> {
        let store = self.store_for(&normalize_mailbox(mailbox)).await?;
        let guard = store.lock().await;
        Ok(guard.covered_window())
    }

    /// Create an item. It appears in the store on the next update.
    #[instrument(skip(self, item), fields(subject = %item.subject))]
    pub async fn create_event(&self, mailbox: &str, item: &NewCalendarItem) -> Result<()> {
        if item.start_time > item.end_time {
            return Err(RoomSyncError::InvalidInput(format!(
                "new item '{}' ends before it starts",
                item.subject
            )));
        }
        self.gateway.create_item(&normalize_mailbox(mailbox), item).await
    }

    /// Reschedule an item. At least one bound must be given.
    #[instrument(skip(self))]
    pub async fn change_event_time(
        &self,
        mailbox: &str,
        item_id: &str,
        new_start: Option<DateTime<Utc>>,
        new_end: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let key = normalize_mailbox(mailbox);
        let current = self.require_item(&key, item_id).await?;

        if new_start.is_none() && new_end.is_none() {
            return Err(RoomSyncError::InvalidInput("no new start or end given".into()));
        }
        let start = new_start.unwrap_or(current.start_time);
        let end = new_end.unwrap_or(current.end_time);
        if start > end {
            return Err(CalendarError::InvalidWindow { start, end }.into());
        }

        self.gateway.change_item_time(&key, &current.identity, new_start, new_end).await
    }

    #[instrument(skip(self, body))]
    pub async fn change_event_body(&self, mailbox: &str, item_id: &str, body: &str) -> Result<()> {
        let key = normalize_mailbox(mailbox);
        let identity = self.identity_of(&key, item_id).await?;
        self.gateway.change_item_body(&key, &identity, body).await
    }

    #[instrument(skip(self))]
    pub async fn delete_event(&self, mailbox: &str, item_id: &str) -> Result<()> {
        let key = normalize_mailbox(mailbox);
        let identity = self.identity_of(&key, item_id).await?;
        self.gateway.delete_item(&key, &identity).await
    }

    pub async fn get_attendees(&self, mailbox: &str, item_id: &str) -> Result<Vec<String>> {
        let key = normalize_mailbox(mailbox);
        let identity = self.identity_of(&key, item_id).await?;
        self.gateway.get_attendees(&key, &identity).await
    }

    #[instrument(skip(self))]
    pub async fn change_attendees(
        &self,
        mailbox: &str,
        item_id: &str,
        add: &[String],
        remove: &[String],
    ) -> Result<()> {
        let key = normalize_mailbox(mailbox);
        let identity = self.identity_of(&key, item_id).await?;
        self.gateway.change_attendees(&key, &identity, add, remove).await
    }

    pub async fn list_attachments(&self, mailbox: &str, item_id: &str) -> Result<Vec<AttachmentRef>> {
        let key = normalize_mailbox(mailbox);
        let identity = self.identity_of(&key, item_id).await?;
        self.gateway.list_attachments(&key, &identity).await
    }

    async fn reconcile_fetched(
        &self,
        key: String,
        window: TimeWindow,
        items: Vec<ItemRecord>,
    ) -> (String, Result<Vec<LifecycleEvent>>) {
        let outcome = async {
            let store = self.store_for(&key).await?;
            let events = {
                let mut guard = store.lock().await;
                self.commit(&mut guard, &window, items).await?
            };
            self.publish(&key, &events).await;
            Ok::<_, RoomSyncError>(events)
        }
        .await;
        (key, outcome)
    }

    /// Reconcile into a copy and swap it in once it has been saved.
    ///
    /// On any error the live store is untouched.
    async fn commit(
        &self,
        live: &mut CalendarWindowStore,
        window: &TimeWindow,
        snapshot: Vec<ItemRecord>,
    ) -> Result<Vec<LifecycleEvent>> {
        let refresh = live.covered_window().is_some_and(|covered| covered.covers(window));
        debug!(
            mailbox = live.mailbox_key(),
            minutes = window.duration().num_minutes(),
            refresh,
            "reconciling snapshot"
        );

        let mut next = live.clone();
        let events = reconcile(&mut next, window, snapshot)?;
        self.persist(&next).await?;
        *live = next;
        Ok(events)
    }

    async fn store_for(&self, key: &str) -> Result<SharedStore> {
        if let Some(store) = self.stores.read().await.get(key) {
            return Ok(Arc::clone(store));
        }

        // Load without holding the map lock; a concurrent loader may win the
        // insert below, in which case its store is used.
        let loaded = match &self.repository {
            Some(repository) => repository.load(key).await?,
            None => None,
        };
        let store = match loaded {
            Some(store) => {
                debug!(mailbox = key, items = store.len(), "restored calendar store");
                store
            }
            None => CalendarWindowStore::new(key),
        };

        let mut stores = self.stores.write().await;
        let shared = stores
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(store)));
        Ok(Arc::clone(shared))
    }

    async fn persist(&self, store: &CalendarWindowStore) -> Result<()> {
        if let Some(repository) = &self.repository {
            repository.save(store).await?;
        }
        Ok(())
    }

    async fn publish(&self, key: &str, events: &[LifecycleEvent]) {
        let summary = ReconcileSummary::from_events(events);
        info!(
            mailbox = key,
            created = summary.created,
            changed = summary.changed,
            deleted = summary.deleted,
            "calendar update completed"
        );

        if events.is_empty() {
            return;
        }
        if let Some(sink) = &self.sink {
            sink.notify(key, events).await;
        }
    }

    async fn require_item(&self, key: &str, item_id: &str) -> Result<ItemRecord> {
        let store = self.store_for(key).await?;
        let guard = store.lock().await;
        Ok(guard.require(item_id)?.clone())
    }

    async fn identity_of(&self, key: &str, item_id: &str) -> Result<ItemIdentity> {
        Ok(self.require_item(key, item_id).await?.identity)
    }
}
