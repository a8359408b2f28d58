//! Error types used throughout the application

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by the calendar store and reconciliation engine.
///
/// `InvalidWindow` is a caller bug, `DuplicateIdentity` is a data integrity
/// violation reported by the gateway, and `NotFound` is benign.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CalendarError {
    #[error("Invalid window: start {start} is after end {end}")]
    InvalidWindow { start: DateTime<Utc>, end: DateTime<Utc> },

    #[error("Duplicate item identity in snapshot: {item_id}")]
    DuplicateIdentity { item_id: String },

    #[error("Calendar item not found: {item_id}")]
    NotFound { item_id: String },
}

/// Main error type for RoomSync
#[derive(Error, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum RoomSyncError {
    #[error(transparent)]
    Calendar(#[from] CalendarError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RoomSyncError {
    /// True for benign lookups that found nothing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Calendar(CalendarError::NotFound { .. }))
    }
}

/// Result type alias for RoomSync operations
pub type Result<T> = std::result::Result<T, RoomSyncError>;
