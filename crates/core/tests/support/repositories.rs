//! In-memory mocks for the store repository and event sink ports.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use roomsync_core::{CalendarEventSink, CalendarStoreRepository, CalendarWindowStore};
use roomsync_domain::{LifecycleEvent, Result as DomainResult, RoomSyncError};

/// Keeps saved stores in a map keyed by mailbox.
#[derive(Default, Clone)]
pub struct InMemoryStoreRepository {
    stores: Arc<Mutex<HashMap<String, CalendarWindowStore>>>,
    saves: Arc<Mutex<usize>>,
    failing_saves: Arc<Mutex<HashMap<String, usize>>>,
}

impl InMemoryStoreRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store as if saved by a previous process.
    pub fn with_store(self, store: CalendarWindowStore) -> Self {
        self.stores.lock().unwrap().insert(store.mailbox_key().to_string(), store);
        self
    }

    pub fn saved(&self, mailbox: &str) -> Option<CalendarWindowStore> {
        self.stores.lock().unwrap().get(mailbox).cloned()
    }

    /// Make the next `times` saves of `mailbox` fail.
    pub fn fail_saves(&self, mailbox: &str, times: usize) {
        self.failing_saves.lock().unwrap().insert(mailbox.to_string(), times);
    }

    pub fn save_count(&self) -> usize {
        *self.saves.lock().unwrap()
    }
}

#[async_trait]
impl CalendarStoreRepository for InMemoryStoreRepository {
    async fn load(&self, mailbox: &str) -> DomainResult<Option<CalendarWindowStore>> {
        Ok(self.stores.lock().unwrap().get(mailbox).cloned())
    }

    async fn save(&self, store: &CalendarWindowStore) -> DomainResult<()> {
        if let Some(remaining) = self.failing_saves.lock().unwrap().get_mut(store.mailbox_key()) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(RoomSyncError::Persistence("disk full".into()));
            }
        }
        self.stores.lock().unwrap().insert(store.mailbox_key().to_string(), store.clone());
        *self.saves.lock().unwrap() += 1;
        Ok(())
    }
}

/// Repository whose loads of one mailbox wait until released.
#[derive(Clone)]
pub struct GatedRepository {
    gated: String,
    gate: Arc<tokio::sync::Notify>,
}

impl GatedRepository {
    pub fn new(gated: &str) -> Self {
        Self { gated: gated.to_string(), gate: Arc::new(tokio::sync::Notify::new()) }
    }

    pub fn release(&self) {
        self.gate.notify_one();
    }
}

#[async_trait]
impl CalendarStoreRepository for GatedRepository {
    async fn load(&self, mailbox: &str) -> DomainResult<Option<CalendarWindowStore>> {
        if mailbox == self.gated {
            self.gate.notified().await;
        }
        Ok(None)
    }

    async fn save(&self, _store: &CalendarWindowStore) -> DomainResult<()> {
        Ok(())
    }
}

/// Records every notification.
#[derive(Default, Clone)]
pub struct RecordingSink {
    received: Arc<Mutex<Vec<(String, Vec<LifecycleEvent>)>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn received(&self) -> Vec<(String, Vec<LifecycleEvent>)> {
        self.received.lock().unwrap().clone()
    }
}

#[async_trait]
impl CalendarEventSink for RecordingSink {
    async fn notify(&self, mailbox: &str, events: &[LifecycleEvent]) {
        self.received.lock().unwrap().push((mailbox.to_string(), events.to_vec()));
    }
}
