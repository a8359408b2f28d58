//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If the service account is not set there, falls back to a file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! The result is validated with [`Config::validate`] before it is returned.
//!
//! ## Environment Variables
//! - `ROOMSYNC_EWS_USERNAME`: Service account address (required)
//! - `ROOMSYNC_EWS_PASSWORD`: Service account password (Basic auth)
//! - `ROOMSYNC_EWS_AUTH`: `basic` or `oauth` (default `basic`)
//! - `ROOMSYNC_EWS_SERVER_URL`: Exchange server base URL
//! - `ROOMSYNC_EWS_API_VERSION`: `RequestServerVersion` value
//! - `ROOMSYNC_EWS_IMPERSONATION`: Mailbox to impersonate
//! - `ROOMSYNC_EWS_TIMEZONE`: IANA timezone for created items
//! - `ROOMSYNC_EWS_VERIFY_CERTS`: Verify TLS certificates (true/false)
//! - `ROOMSYNC_EWS_TIMEOUT_SECS`: Request timeout in seconds
//! - `ROOMSYNC_SYNC_LOOKBACK_HOURS`: Default window start before now
//! - `ROOMSYNC_SYNC_LOOKAHEAD_HOURS`: Default window end after now
//! - `ROOMSYNC_SYNC_STORAGE_DIR`: Directory for persisted stores
//! - `ROOMSYNC_LOG_LEVEL`: Default tracing filter
//! - `ROOMSYNC_LOG_JSON`: Emit JSON log lines (true/false)
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./roomsync.json` or `./roomsync.toml` (current working directory)
//! 2. `./config.json` or `./config.toml` (current working directory)
//! 3. `../roomsync.json` or `../roomsync.toml` (parent directory)
//! 4. Relative to executable location

use std::path::{Path, PathBuf};
use std::str::FromStr;

use roomsync_domain::{
    AuthKind, Config, EwsConfig, LoggingConfig, Result, RoomSyncError, SyncConfig,
};

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If any required
/// variables are missing, falls back to loading from a config file.
///
/// # Errors
/// Returns `RoomSyncError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - The loaded configuration fails validation
pub fn load() -> Result<Config> {
    let config = match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            config
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)?
        }
    };

    config.validate()?;
    Ok(config)
}

/// Load configuration from environment variables
///
/// Only `ROOMSYNC_EWS_USERNAME` is required; everything else falls back to
/// the defaults in `roomsync_domain::config`.
///
/// # Errors
/// Returns `RoomSyncError::Config` if the username is missing or a value
/// cannot be parsed.
pub fn load_from_env() -> Result<Config> {
    let username = env_var("ROOMSYNC_EWS_USERNAME")?;
    let defaults = Config::default();

    let auth = match env_opt("ROOMSYNC_EWS_AUTH") {
        Some(raw) => AuthKind::from_str(&raw).map_err(RoomSyncError::Config)?,
        None => AuthKind::default(),
    };

    let ews = EwsConfig {
        server_url: env_opt("ROOMSYNC_EWS_SERVER_URL"),
        api_version: env_opt("ROOMSYNC_EWS_API_VERSION").unwrap_or(defaults.ews.api_version),
        auth,
        username: Some(username),
        password: env_opt("ROOMSYNC_EWS_PASSWORD"),
        impersonation: env_opt("ROOMSYNC_EWS_IMPERSONATION"),
        timezone: env_opt("ROOMSYNC_EWS_TIMEZONE"),
        verify_certs: env_bool("ROOMSYNC_EWS_VERIFY_CERTS", defaults.ews.verify_certs),
        request_timeout_secs: env_parse(
            "ROOMSYNC_EWS_TIMEOUT_SECS",
            defaults.ews.request_timeout_secs,
        )?,
    };

    let sync = SyncConfig {
        lookback_hours: env_parse("ROOMSYNC_SYNC_LOOKBACK_HOURS", defaults.sync.lookback_hours)?,
        lookahead_hours: env_parse(
            "ROOMSYNC_SYNC_LOOKAHEAD_HOURS",
            defaults.sync.lookahead_hours,
        )?,
        storage_dir: env_opt("ROOMSYNC_SYNC_STORAGE_DIR"),
    };

    let logging = LoggingConfig {
        level: env_opt("ROOMSYNC_LOG_LEVEL").unwrap_or(defaults.logging.level),
        json: env_bool("ROOMSYNC_LOG_JSON", defaults.logging.json),
    };

    Ok(Config { ews, sync, logging })
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `RoomSyncError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(RoomSyncError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            RoomSyncError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| RoomSyncError::Config(format!("Failed to read config file: {}", e)))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content, format chosen by extension.
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| RoomSyncError::Config(format!("Invalid TOML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| RoomSyncError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(RoomSyncError::Config(format!("Unsupported config format: {}", extension))),
    }
}

const CONFIG_FILE_NAMES: [&str; 4] =
    ["roomsync.json", "roomsync.toml", "config.json", "config.toml"];

/// Probe multiple paths for configuration files
///
/// Searches the current working directory, its parent, then the
/// executable's directory.
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut dirs = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd.clone());
        dirs.push(cwd.join(".."));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            dirs.push(exe_dir.to_path_buf());
        }
    }

    probe_in(&dirs)
}

fn probe_in(dirs: &[PathBuf]) -> Option<PathBuf> {
    dirs.iter()
        .flat_map(|dir| CONFIG_FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.exists())
}

/// Get required environment variable
///
/// # Errors
/// Returns `RoomSyncError::Config` if the variable is not set.
fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| {
        RoomSyncError::Config(format!("Missing required environment variable: {}", key))
    })
}

/// Optional variable; empty strings count as unset.
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_opt(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| RoomSyncError::Config(format!("Invalid value for {}: {}", key, e))),
        None => Ok(default),
    }
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use once_cell::sync::Lazy;
    use tempfile::TempDir;

    use super::*;

    static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    const ALL_VARS: [&str; 14] = [
        "ROOMSYNC_EWS_USERNAME",
        "ROOMSYNC_EWS_PASSWORD",
        "ROOMSYNC_EWS_AUTH",
        "ROOMSYNC_EWS_SERVER_URL",
        "ROOMSYNC_EWS_API_VERSION",
        "ROOMSYNC_EWS_IMPERSONATION",
        "ROOMSYNC_EWS_TIMEZONE",
        "ROOMSYNC_EWS_VERIFY_CERTS",
        "ROOMSYNC_EWS_TIMEOUT_SECS",
        "ROOMSYNC_SYNC_LOOKBACK_HOURS",
        "ROOMSYNC_SYNC_LOOKAHEAD_HOURS",
        "ROOMSYNC_SYNC_STORAGE_DIR",
        "ROOMSYNC_LOG_LEVEL",
        "ROOMSYNC_LOG_JSON",
    ];

    fn clear_env() {
        for key in ALL_VARS {
            std::env::remove_var(key);
        }
    }

    fn write_file(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_env_bool_parsing() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");

        std::env::set_var("ROOMSYNC_TEST_BOOL_YES", "yes");
        std::env::set_var("ROOMSYNC_TEST_BOOL_UPPER", "TRUE");
        std::env::set_var("ROOMSYNC_TEST_BOOL_OFF", "off");

        assert!(env_bool("ROOMSYNC_TEST_BOOL_YES", false));
        assert!(env_bool("ROOMSYNC_TEST_BOOL_UPPER", false));
        assert!(!env_bool("ROOMSYNC_TEST_BOOL_OFF", true));

        std::env::remove_var("ROOMSYNC_TEST_BOOL_MISSING");
        assert!(env_bool("ROOMSYNC_TEST_BOOL_MISSING", true));

        std::env::remove_var("ROOMSYNC_TEST_BOOL_YES");
        std::env::remove_var("ROOMSYNC_TEST_BOOL_UPPER");
        std::env::remove_var("ROOMSYNC_TEST_BOOL_OFF");
    }

    #[test]
    fn test_load_from_env_all_vars_set() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("ROOMSYNC_EWS_USERNAME", "svc-rooms@example.com");
        std::env::set_var("ROOMSYNC_EWS_PASSWORD", "s3cret");
        std::env::set_var("ROOMSYNC_EWS_SERVER_URL", "https://mail.example.com");
        std::env::set_var("ROOMSYNC_EWS_IMPERSONATION", "room.4a@example.com");
        std::env::set_var("ROOMSYNC_EWS_TIMEZONE", "America/New_York");
        std::env::set_var("ROOMSYNC_EWS_VERIFY_CERTS", "false");
        std::env::set_var("ROOMSYNC_EWS_TIMEOUT_SECS", "10");
        std::env::set_var("ROOMSYNC_SYNC_LOOKAHEAD_HOURS", "48");
        std::env::set_var("ROOMSYNC_SYNC_STORAGE_DIR", "/var/lib/roomsync");
        std::env::set_var("ROOMSYNC_LOG_LEVEL", "debug");

        let result = load_from_env();
        assert!(result.is_ok(), "Should load config from env vars, error: {:?}", result.err());

        let config = result.unwrap();
        assert_eq!(config.ews.username.as_deref(), Some("svc-rooms@example.com"));
        assert_eq!(config.ews.auth, AuthKind::Basic);
        assert_eq!(config.ews.endpoint_url(), "https://mail.example.com/EWS/exchange.asmx");
        assert_eq!(config.ews.impersonation.as_deref(), Some("room.4a@example.com"));
        assert!(!config.ews.verify_certs);
        assert_eq!(config.ews.request_timeout_secs, 10);
        assert_eq!(config.sync.lookback_hours, 24);
        assert_eq!(config.sync.lookahead_hours, 48);
        assert_eq!(config.sync.storage_dir.as_deref(), Some("/var/lib/roomsync"));
        assert_eq!(config.logging.level, "debug");
        assert!(config.validate().is_ok());

        clear_env();
    }

    #[test]
    fn test_load_from_env_missing_username() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        let err = load_from_env().unwrap_err();
        assert!(matches!(err, RoomSyncError::Config(_)), "Should be a Config error");
    }

    #[test]
    fn test_load_from_env_invalid_values() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("ROOMSYNC_EWS_USERNAME", "svc-rooms@example.com");
        std::env::set_var("ROOMSYNC_EWS_TIMEOUT_SECS", "soon");
        assert!(matches!(load_from_env(), Err(RoomSyncError::Config(_))));

        std::env::remove_var("ROOMSYNC_EWS_TIMEOUT_SECS");
        std::env::set_var("ROOMSYNC_EWS_AUTH", "ntlm");
        assert!(matches!(load_from_env(), Err(RoomSyncError::Config(_))));

        clear_env();
    }

    #[test]
    fn test_load_from_env_oauth() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("ROOMSYNC_EWS_USERNAME", "svc-rooms@example.com");
        std::env::set_var("ROOMSYNC_EWS_AUTH", "OAuth");

        let config = load_from_env().unwrap();
        assert_eq!(config.ews.auth, AuthKind::OAuth);
        assert!(config.validate().is_ok());

        clear_env();
    }

    #[test]
    fn test_load_from_file_json() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            "roomsync.json",
            r#"{
                "ews": {
                    "username": "svc-rooms@example.com",
                    "password": "s3cret",
                    "impersonation": "room.4a@example.com"
                },
                "sync": { "lookback_hours": 2 }
            }"#,
        );

        let config = load_from_file(Some(path)).unwrap();
        assert_eq!(config.ews.impersonation.as_deref(), Some("room.4a@example.com"));
        assert_eq!(config.sync.lookback_hours, 2);
        assert_eq!(config.sync.lookahead_hours, 168);
    }

    #[test]
    fn test_load_from_file_toml() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            "roomsync.toml",
            r#"
[ews]
auth = "oauth"
server_url = "https://mail.example.com"
timezone = "Europe/London"

[logging]
level = "warn"
json = true
"#,
        );

        let config = load_from_file(Some(path)).unwrap();
        assert_eq!(config.ews.auth, AuthKind::OAuth);
        assert_eq!(config.ews.timezone.as_deref(), Some("Europe/London"));
        assert!(config.logging.json);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file_not_found() {
        let result = load_from_file(Some(PathBuf::from("/nonexistent/roomsync.json")));
        assert!(matches!(result, Err(RoomSyncError::Config(_))));
    }

    #[test]
    fn test_load_from_file_invalid_json() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "roomsync.json", r#"{ "ews": "#);

        assert!(load_from_file(Some(path)).is_err());
    }

    #[test]
    fn test_probe_prefers_roomsync_over_config() {
        let dir = TempDir::new().unwrap();
        write_file(&dir, "config.toml", "");
        let preferred = write_file(&dir, "roomsync.toml", "");

        let found = probe_in(&[dir.path().to_path_buf()]);
        assert_eq!(found, Some(preferred));
    }

    #[test]
    fn test_probe_returns_none_for_empty_dirs() {
        let dir = TempDir::new().unwrap();
        assert_eq!(probe_in(&[dir.path().to_path_buf()]), None);
    }

    #[test]
    fn test_parse_config_unsupported_format() {
        let path = PathBuf::from("roomsync.yaml");
        assert!(parse_config("ews: {}", &path).is_err());
    }
}
