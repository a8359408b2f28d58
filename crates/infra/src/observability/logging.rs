//! `tracing-subscriber` setup.

use roomsync_domain::{LoggingConfig, Result, RoomSyncError};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `config.level`. Calling this twice returns an error
/// instead of panicking.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = build_filter(config)?;
    let registry = tracing_subscriber::registry().with(filter);

    let installed = if config.json {
        registry.with(tracing_subscriber::fmt::layer().json()).try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };

    installed.map_err(|err| RoomSyncError::Internal(format!("tracing already initialised: {err}")))
}

fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.level)
        .map_err(|err| RoomSyncError::Config(format!("invalid log level '{}': {err}", config.level)))
}

/// Short, stable label for an error, used as a structured log field.
pub fn error_label(err: &RoomSyncError) -> &'static str {
    match err {
        RoomSyncError::Calendar(_) => "calendar",
        RoomSyncError::Config(_) => "config",
        RoomSyncError::Network(_) => "network",
        RoomSyncError::Auth(_) => "auth",
        RoomSyncError::Protocol(_) => "protocol",
        RoomSyncError::Conflict(_) => "conflict",
        RoomSyncError::Persistence(_) => "persistence",
        RoomSyncError::NotFound(_) => "not_found",
        RoomSyncError::InvalidInput(_) => "invalid_input",
        RoomSyncError::Internal(_) => "internal",
    }
}
