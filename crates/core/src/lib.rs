//! # RoomSync Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - The per-mailbox calendar window store
//! - Snapshot reconciliation producing lifecycle events
//! - Port interfaces (traits) for the calendar gateway, persistence and
//!   event delivery
//! - `CalendarSyncService`, the use case tying them together
//!
//! ## Architecture Principles
//! - Only depends on `roomsync-domain`
//! - No HTTP, SOAP or filesystem code
//! - All external dependencies via traits

pub mod calendar;

pub use calendar::{
    reconcile, reconcile_between, BatchUpdate, CalendarEventSink, CalendarGateway,
    CalendarStoreRepository, CalendarSyncService, CalendarWindowStore, MailboxSnapshot,
    ReconcileSummary,
};
