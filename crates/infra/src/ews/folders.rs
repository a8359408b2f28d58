//! Calendar folder ids, learned once per mailbox.

use std::collections::HashMap;

use parking_lot::RwLock;
use roomsync_domain::{normalize_mailbox, Result, RoomSyncError};

/// Mailbox to calendar folder id, both directions.
///
/// Batch FindItem responses only carry `ParentFolderId`; this is how items
/// are attributed back to their mailbox.
#[derive(Debug, Default)]
pub struct FolderCache {
    by_mailbox: RwLock<HashMap<String, String>>,
}

impl FolderCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, mailbox: &str) -> Option<String> {
        self.by_mailbox.read().get(&normalize_mailbox(mailbox)).cloned()
    }

    /// Mailboxes from `mailboxes` with no cached folder id.
    pub fn missing(&self, mailboxes: &[String]) -> Vec<String> {
        let known = self.by_mailbox.read();
        mailboxes
            .iter()
            .map(|mailbox| normalize_mailbox(mailbox))
            .filter(|key| !known.contains_key(key))
            .collect()
    }

    pub fn insert(&self, mailbox: &str, folder_id: impl Into<String>) {
        self.by_mailbox.write().insert(normalize_mailbox(mailbox), folder_id.into());
    }

    /// Reverse lookup.
    ///
    /// # Errors
    /// `RoomSyncError::NotFound` for folder ids never seen.
    pub fn mailbox_for(&self, folder_id: &str) -> Result<String> {
        self.by_mailbox
            .read()
            .iter()
            .find(|(_, id)| id.as_str() == folder_id)
            .map(|(mailbox, _)| mailbox.clone())
            .ok_or_else(|| RoomSyncError::NotFound(format!("no mailbox for folder {folder_id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caches_both_directions() {
        let cache = FolderCache::new();
        cache.insert("Room.4A@example.com", "F-1");

        assert_eq!(cache.get("room.4a@example.com").as_deref(), Some("F-1"));
        assert_eq!(cache.mailbox_for("F-1").unwrap(), "room.4a@example.com");
        assert!(cache.mailbox_for("F-2").unwrap_err().is_not_found());
    }

    #[test]
    fn reports_missing_mailboxes() {
        let cache = FolderCache::new();
        cache.insert("room.4a@example.com", "F-1");

        let missing = cache.missing(&["room.4a@example.com".into(), "Room.5B@example.com".into()]);
        assert_eq!(missing, vec!["room.5b@example.com"]);
    }
}
