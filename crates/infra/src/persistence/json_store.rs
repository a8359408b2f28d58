//! One JSON file per mailbox.

use std::fmt::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use roomsync_core::{CalendarStoreRepository, CalendarWindowStore};
use roomsync_domain::{normalize_mailbox, Result, RoomSyncError};
use tracing::debug;

use crate::errors::InfraError;

/// Stores each mailbox at `<dir>/<mailbox>.json`.
///
/// Writes go to a temporary sibling first and are renamed into place, so a
/// crash never leaves a half-written store behind.
#[derive(Debug, Clone)]
pub struct JsonFileStoreRepository {
    dir: PathBuf,
}

impl JsonFileStoreRepository {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding `mailbox`'s store.
    ///
    /// Bytes outside `[a-z0-9@.-]` are written as `_xx` hex, `_` included,
    /// so distinct mailboxes never share a file.
    pub fn path_for(&self, mailbox: &str) -> PathBuf {
        let mut file_name = String::new();
        for byte in normalize_mailbox(mailbox).bytes() {
            if byte.is_ascii_alphanumeric() || matches!(byte, b'@' | b'.' | b'-') {
                file_name.push(char::from(byte));
            } else {
                let _ = write!(file_name, "_{byte:02x}");
            }
        }
        self.dir.join(format!("{file_name}.json"))
    }
}

fn infra(err: impl Into<InfraError>) -> RoomSyncError {
    RoomSyncError::from(err.into())
}

#[async_trait]
impl CalendarStoreRepository for JsonFileStoreRepository {
    async fn load(&self, mailbox: &str) -> Result<Option<CalendarWindowStore>> {
        let path = self.path_for(mailbox);
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(infra(err)),
        };

        let store: CalendarWindowStore = serde_json::from_slice(&raw).map_err(infra)?;
        if store.mailbox_key() != normalize_mailbox(mailbox) {
            return Err(RoomSyncError::Persistence(format!(
                "{} holds mailbox {}, expected {}",
                path.display(),
                store.mailbox_key(),
                normalize_mailbox(mailbox)
            )));
        }

        debug!(path = %path.display(), items = store.len(), "loaded calendar store");
        Ok(Some(store))
    }

    async fn save(&self, store: &CalendarWindowStore) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(infra)?;

        let path = self.path_for(store.mailbox_key());
        let tmp = path.with_extension("json.tmp");
        let raw = serde_json::to_vec_pretty(store).map_err(infra)?;

        tokio::fs::write(&tmp, raw).await.map_err(infra)?;
        tokio::fs::rename(&tmp, &path).await.map_err(infra)?;

        debug!(path = %path.display(), items = store.len(), "saved calendar store");
        Ok(())
    }
}
