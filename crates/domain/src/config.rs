//! Configuration structures
//!
//! Loaded by `roomsync-infra::config` from environment variables or a
//! JSON/TOML file. Every section has serde defaults so partial files work.

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_EWS_API_VERSION, DEFAULT_EWS_SERVER_URL, DEFAULT_LOG_LEVEL, DEFAULT_LOOKAHEAD_HOURS,
    DEFAULT_LOOKBACK_HOURS, DEFAULT_REQUEST_TIMEOUT_SECS, EWS_ENDPOINT_PATH,
};
use crate::errors::{Result, RoomSyncError};
use crate::impl_domain_status_conversions;
use crate::types::TimeWindow;

/// How requests authenticate against Exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthKind {
    #[default]
    Basic,
    OAuth,
}

impl_domain_status_conversions!(AuthKind {
    Basic => "basic",
    OAuth => "oauth",
});

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub ews: EwsConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Check cross-field requirements.
    ///
    /// # Errors
    /// Returns `RoomSyncError::Config` for missing Basic credentials or an
    /// unknown timezone.
    pub fn validate(&self) -> Result<()> {
        if self.ews.auth == AuthKind::Basic
            && (self.ews.username.is_none() || self.ews.password.is_none())
        {
            return Err(RoomSyncError::Config(
                "basic authentication requires both username and password".into(),
            ));
        }

        self.ews.timezone()?;

        if self.ews.request_timeout_secs == 0 {
            return Err(RoomSyncError::Config("request timeout must be positive".into()));
        }

        Ok(())
    }
}

/// Exchange Web Services connection settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct EwsConfig {
    #[serde(default)]
    pub server_url: Option<String>,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default)]
    pub auth: AuthKind,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Mailbox to act as (room accounts).
    #[serde(default)]
    pub impersonation: Option<String>,
    /// IANA timezone name; `None` means UTC.
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default = "default_true")]
    pub verify_certs: bool,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl EwsConfig {
    /// Full SOAP endpoint, e.g. `https://outlook.office365.com/EWS/exchange.asmx`.
    pub fn endpoint_url(&self) -> String {
        let base = self.server_url.as_deref().unwrap_or(DEFAULT_EWS_SERVER_URL);
        format!("{}{}", base.trim_end_matches('/'), EWS_ENDPOINT_PATH)
    }

    /// Parsed timezone.
    ///
    /// # Errors
    /// Returns `RoomSyncError::Config` for names `chrono-tz` does not know.
    pub fn timezone(&self) -> Result<Tz> {
        match self.timezone.as_deref() {
            None => Ok(Tz::UTC),
            Some(name) => name
                .parse::<Tz>()
                .map_err(|e| RoomSyncError::Config(format!("Invalid timezone '{name}': {e}"))),
        }
    }
}

impl Default for EwsConfig {
    fn default() -> Self {
        Self {
            server_url: None,
            api_version: default_api_version(),
            auth: AuthKind::default(),
            username: None,
            password: None,
            impersonation: None,
            timezone: None,
            verify_certs: true,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

// Hand-written so the password never reaches logs.
impl std::fmt::Debug for EwsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EwsConfig")
            .field("server_url", &self.server_url)
            .field("api_version", &self.api_version)
            .field("auth", &self.auth)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("impersonation", &self.impersonation)
            .field("timezone", &self.timezone)
            .field("verify_certs", &self.verify_certs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

/// Polling window and persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default = "default_lookback")]
    pub lookback_hours: u32,
    #[serde(default = "default_lookahead")]
    pub lookahead_hours: u32,
    /// Directory for per-mailbox JSON state; `None` disables persistence.
    #[serde(default)]
    pub storage_dir: Option<String>,
}

impl SyncConfig {
    /// Default reconciliation window around `now`.
    pub fn default_window(&self, now: DateTime<Utc>) -> TimeWindow {
        TimeWindow::around(
            now,
            Duration::hours(i64::from(self.lookback_hours)),
            Duration::hours(i64::from(self.lookahead_hours)),
        )
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            lookback_hours: DEFAULT_LOOKBACK_HOURS,
            lookahead_hours: DEFAULT_LOOKAHEAD_HOURS,
            storage_dir: None,
        }
    }
}

/// `tracing-subscriber` settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), json: false }
    }
}

fn default_api_version() -> String {
    DEFAULT_EWS_API_VERSION.to_string()
}

fn default_true() -> bool {
    true
}

fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_lookback() -> u32 {
    DEFAULT_LOOKBACK_HOURS
}

fn default_lookahead() -> u32 {
    DEFAULT_LOOKAHEAD_HOURS
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}
