//! Lifecycle events produced by reconciliation.

use serde::{Deserialize, Serialize};

use super::item::ItemRecord;
use crate::impl_domain_status_conversions;

/// A detected change to one calendar item. Never a no-op.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LifecycleEvent {
    Created(ItemRecord),
    Changed { old: ItemRecord, new: ItemRecord },
    Deleted(ItemRecord),
}

/// Discriminant of a [`LifecycleEvent`], also its sort rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Deleted,
    Changed,
    Created,
}

impl_domain_status_conversions!(EventKind {
    Deleted => "deleted",
    Changed => "changed",
    Created => "created",
});

impl LifecycleEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Created(_) => EventKind::Created,
            Self::Changed { .. } => EventKind::Changed,
            Self::Deleted(_) => EventKind::Deleted,
        }
    }

    pub fn item_id(&self) -> &str {
        match self {
            Self::Created(item) | Self::Deleted(item) => item.item_id(),
            Self::Changed { new, .. } => new.item_id(),
        }
    }

    /// The record as it stands after the event (`None` for deletions).
    pub fn current(&self) -> Option<&ItemRecord> {
        match self {
            Self::Created(item) => Some(item),
            Self::Changed { new, .. } => Some(new),
            Self::Deleted(_) => None,
        }
    }
}
