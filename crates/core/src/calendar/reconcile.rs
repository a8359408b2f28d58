//! Windowed diff of a remote snapshot against a mailbox store.
//!
//! Identity is the item id alone. A record whose id is known but whose change
//! key differs is the same item changed, never a delete plus a create. Items
//! outside the reconciled window are left untouched.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use roomsync_domain::{CalendarError, EventKind, ItemRecord, LifecycleEvent, TimeWindow};
use tracing::debug;

use super::store::CalendarWindowStore;

/// Event counts for one reconciliation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub created: usize,
    pub changed: usize,
    pub deleted: usize,
}

impl ReconcileSummary {
    pub fn from_events(events: &[LifecycleEvent]) -> Self {
        events.iter().fold(Self::default(), |mut summary, event| {
            match event.kind() {
                EventKind::Created => summary.created += 1,
                EventKind::Changed => summary.changed += 1,
                EventKind::Deleted => summary.deleted += 1,
            }
            summary
        })
    }

    pub fn total(&self) -> usize {
        self.created + self.changed + self.deleted
    }
}

/// Reconcile `snapshot` against `store`, treating it as authoritative for
/// `window`.
///
/// Returns events ordered Deleted, then Changed, then Created, each group by
/// ascending item id. The store is left unmodified on error.
///
/// # Errors
/// Returns [`CalendarError::DuplicateIdentity`] if two snapshot records
/// share an item id.
pub fn reconcile(
    store: &mut CalendarWindowStore,
    window: &TimeWindow,
    snapshot: Vec<ItemRecord>,
) -> Result<Vec<LifecycleEvent>, CalendarError> {
    let mut incoming = index_snapshot(snapshot)?;

    let in_window: HashSet<String> = store
        .items()
        .filter(|item| item.overlaps(window))
        .map(|item| item.item_id().to_string())
        .collect();

    let mut events = Vec::new();

    for item_id in &in_window {
        match incoming.remove(item_id) {
            None => {
                if let Some(old) = store.remove(item_id) {
                    events.push(LifecycleEvent::Deleted(old));
                }
            }
            Some(new) => {
                if let Some(event) = replace_if_changed(store, new) {
                    events.push(event);
                }
            }
        }
    }

    // Whatever is left was not known inside the window. A known id whose old
    // span lay outside the window has moved in: same item, not a new one.
    for (_, new) in incoming {
        if store.get(new.item_id()).is_some() {
            if let Some(event) = replace_if_changed(store, new) {
                events.push(event);
            }
        } else {
            store.insert(new.clone());
            events.push(LifecycleEvent::Created(new));
        }
    }

    store.widen_coverage(window);

    events.sort_by(|a, b| a.kind().cmp(&b.kind()).then_with(|| a.item_id().cmp(b.item_id())));

    let summary = ReconcileSummary::from_events(&events);
    debug!(
        mailbox = store.mailbox_key(),
        window_start = %window.start(),
        window_end = %window.end(),
        created = summary.created,
        changed = summary.changed,
        deleted = summary.deleted,
        "reconciled calendar snapshot"
    );

    Ok(events)
}

/// [`reconcile`] for raw bounds.
///
/// # Errors
/// Returns [`CalendarError::InvalidWindow`] when `start > end`, otherwise as
/// [`reconcile`].
pub fn reconcile_between(
    store: &mut CalendarWindowStore,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    snapshot: Vec<ItemRecord>,
) -> Result<Vec<LifecycleEvent>, CalendarError> {
    let window = TimeWindow::new(start, end)?;
    reconcile(store, &window, snapshot)
}

fn index_snapshot(snapshot: Vec<ItemRecord>) -> Result<HashMap<String, ItemRecord>, CalendarError> {
    let mut indexed = HashMap::with_capacity(snapshot.len());
    for item in snapshot {
        let item_id = item.item_id().to_string();
        if indexed.contains_key(&item_id) {
            return Err(CalendarError::DuplicateIdentity { item_id });
        }
        indexed.insert(item_id, item);
    }
    Ok(indexed)
}

/// Swap in `new` when its change key differs from the stored record.
fn replace_if_changed(store: &mut CalendarWindowStore, new: ItemRecord) -> Option<LifecycleEvent> {
    let unchanged = store.get(new.item_id()).is_some_and(|old| old.change_key() == new.change_key());
    if unchanged {
        return None;
    }

    let old = store.remove(new.item_id())?;
    store.insert(new.clone());
    Some(LifecycleEvent::Changed { old, new })
}
