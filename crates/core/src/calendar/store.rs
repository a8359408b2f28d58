//! Per-mailbox store of known calendar items.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use roomsync_domain::{normalize_mailbox, CalendarError, ItemRecord, LifecycleEvent, TimeWindow};
use serde::{Deserialize, Serialize};

/// What is currently known to be on one mailbox's calendar.
///
/// Mutated only by [`crate::calendar::reconcile`] and
/// [`CalendarWindowStore::apply_events`]. Coverage only ever widens unless
/// [`CalendarWindowStore::reset_coverage`] is called.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarWindowStore {
    mailbox_key: String,
    items: HashMap<String, ItemRecord>,
    covered_window: Option<TimeWindow>,
}

impl CalendarWindowStore {
    pub fn new(mailbox: &str) -> Self {
        Self { mailbox_key: normalize_mailbox(mailbox), items: HashMap::new(), covered_window: None }
    }

    pub fn mailbox_key(&self) -> &str {
        &self.mailbox_key
    }

    /// Span last confirmed by reconciliation, if any.
    pub fn covered_window(&self) -> Option<TimeWindow> {
        self.covered_window
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, item_id: &str) -> Option<&ItemRecord> {
        self.items.get(item_id)
    }

    /// Like [`get`](Self::get) but absence is an error.
    ///
    /// # Errors
    /// Returns [`CalendarError::NotFound`] when no item has this id.
    pub fn require(&self, item_id: &str) -> Result<&ItemRecord, CalendarError> {
        self.items.get(item_id).ok_or_else(|| CalendarError::NotFound { item_id: item_id.to_string() })
    }

    /// All stored items, in no particular order.
    pub fn items(&self) -> impl Iterator<Item = &ItemRecord> + '_ {
        self.items.values()
    }

    /// Items whose `[start, end]` contains `instant`, e.g. "what's on now".
    ///
    /// Sorted by start time, ties by item id.
    pub fn items_overlapping(&self, instant: DateTime<Utc>) -> std::vec::IntoIter<&ItemRecord> {
        sorted(self.items.values().filter(|item| item.contains(instant)))
    }

    /// Items overlapping `[start, end]`, sorted like
    /// [`items_overlapping`](Self::items_overlapping).
    ///
    /// # Errors
    /// Returns [`CalendarError::InvalidWindow`] when `start > end`.
    pub fn items_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<std::vec::IntoIter<&ItemRecord>, CalendarError> {
        let window = TimeWindow::new(start, end)?;
        Ok(self.items_in_window(&window))
    }

    fn items_in_window(&self, window: &TimeWindow) -> std::vec::IntoIter<&ItemRecord> {
        sorted(self.items.values().filter(|item| item.overlaps(window)))
    }

    /// Replay lifecycle events without re-fetching.
    ///
    /// Coverage is left alone; events carry no window.
    pub fn apply_events<'a, I>(&mut self, events: I)
    where
        I: IntoIterator<Item = &'a LifecycleEvent>,
    {
        for event in events {
            match event {
                LifecycleEvent::Created(item) | LifecycleEvent::Changed { new: item, .. } => {
                    self.items.insert(item.item_id().to_string(), item.clone());
                }
                LifecycleEvent::Deleted(item) => {
                    self.items.remove(item.item_id());
                }
            }
        }
    }

    /// Forget coverage. Items are kept.
    pub fn reset_coverage(&mut self) {
        self.covered_window = None;
    }

    pub(crate) fn insert(&mut self, item: ItemRecord) {
        self.items.insert(item.item_id().to_string(), item);
    }

    pub(crate) fn remove(&mut self, item_id: &str) -> Option<ItemRecord> {
        self.items.remove(item_id)
    }

    pub(crate) fn widen_coverage(&mut self, window: &TimeWindow) {
        self.covered_window = Some(match self.covered_window {
            Some(covered) => covered.union(window),
            None => *window,
        });
    }
}

fn sorted<'a>(items: impl Iterator<Item = &'a ItemRecord>) -> std::vec::IntoIter<&'a ItemRecord> {
    let mut items: Vec<&ItemRecord> = items.collect();
    items.sort_by(|a, b| {
        a.start_time.cmp(&b.start_time).then_with(|| a.item_id().cmp(b.item_id()))
    });
    items.into_iter()
}
