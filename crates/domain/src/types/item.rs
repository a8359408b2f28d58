//! Calendar item snapshots as reported by the remote calendar.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::window::TimeWindow;
use crate::errors::{Result, RoomSyncError};
use crate::impl_domain_status_conversions;

/// Remote identity of a calendar item.
///
/// `item_id` is stable across edits. `change_key` changes whenever the
/// item's content changes and is only used for dirty detection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemIdentity {
    pub item_id: String,
    pub change_key: String,
}

impl ItemIdentity {
    pub fn new(item_id: impl Into<String>, change_key: impl Into<String>) -> Self {
        Self { item_id: item_id.into(), change_key: change_key.into() }
    }
}

/// Whether the remote item reports attachments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentPresence {
    Present,
    Absent,
    #[default]
    Unknown,
}

impl_domain_status_conversions!(AttachmentPresence {
    Present => "true",
    Absent => "false",
    Unknown => "unknown",
});

/// EWS sensitivity marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sensitivity {
    Normal,
    Personal,
    Private,
    Confidential,
}

impl_domain_status_conversions!(Sensitivity {
    Normal => "normal",
    Personal => "personal",
    Private => "private",
    Confidential => "confidential",
});

/// Typed metadata populated by the gateway. Opaque to reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ItemAttributes {
    pub subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organizer_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    pub has_attachments: AttachmentPresence,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_folder_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sensitivity: Option<Sensitivity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_online_meeting: Option<bool>,
}

/// One remote calendar item snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub identity: ItemIdentity,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub attributes: ItemAttributes,
}

impl ItemRecord {
    /// # Errors
    /// Returns `InvalidInput` when `start_time > end_time`.
    pub fn new(
        identity: ItemIdentity,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        attributes: ItemAttributes,
    ) -> Result<Self> {
        if start_time > end_time {
            return Err(RoomSyncError::InvalidInput(format!(
                "calendar item {} ends ({end_time}) before it starts ({start_time})",
                identity.item_id
            )));
        }

        Ok(Self { identity, start_time, end_time, attributes })
    }

    pub fn item_id(&self) -> &str {
        &self.identity.item_id
    }

    pub fn change_key(&self) -> &str {
        &self.identity.change_key
    }

    pub fn subject(&self) -> &str {
        &self.attributes.subject
    }

    pub fn overlaps(&self, window: &TimeWindow) -> bool {
        window.overlaps(self.start_time, self.end_time)
    }

    /// Inclusive: an item ending at `instant` still contains it.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start_time <= instant && instant <= self.end_time
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end_time - self.start_time).num_minutes()
    }

    pub fn has_attachments(&self) -> bool {
        self.attributes.has_attachments == AttachmentPresence::Present
    }
}

/// Payload for creating a new calendar item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCalendarItem {
    pub subject: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub attendees: Vec<String>,
}

impl NewCalendarItem {
    pub fn new(
        subject: impl Into<String>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Self {
        Self { subject: subject.into(), start_time, end_time, body: None, attendees: Vec::new() }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_attendees<I, S>(mut self, attendees: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attendees = attendees.into_iter().map(Into::into).collect();
        self
    }
}

/// Attachment reference (content is never fetched).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRef {
    pub id: String,
    pub name: String,
}

/// Canonical form of a mailbox address used as a store key.
pub fn normalize_mailbox(address: &str) -> String {
    address.trim().to_lowercase()
}
