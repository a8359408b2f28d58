//! Calendar window stores and their reconciliation against a remote source.

pub mod ports;
pub mod reconcile;
pub mod service;
pub mod store;

pub use ports::{CalendarEventSink, CalendarGateway, CalendarStoreRepository, MailboxSnapshot};
pub use reconcile::{reconcile, reconcile_between, ReconcileSummary};
pub use service::{BatchUpdate, CalendarSyncService};
pub use store::CalendarWindowStore;
