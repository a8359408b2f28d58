//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! application.

// Exchange endpoint defaults
pub const DEFAULT_EWS_SERVER_URL: &str = "https://outlook.office365.com";
pub const EWS_ENDPOINT_PATH: &str = "/EWS/exchange.asmx";
pub const DEFAULT_EWS_API_VERSION: &str = "Exchange2007_SP1";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

// FindItem CalendarView page size
pub const CALENDAR_VIEW_MAX_ENTRIES: u32 = 100;

// Default polling window around "now"
pub const DEFAULT_LOOKBACK_HOURS: u32 = 24;
pub const DEFAULT_LOOKAHEAD_HOURS: u32 = 24 * 7;

// Connection status labels
pub const STATUS_AUTHORIZED: &str = "Authorized";

// Logging
pub const DEFAULT_LOG_LEVEL: &str = "info";
