//! Gateway connection health.

use serde::{Deserialize, Serialize};

use crate::impl_domain_status_conversions;

/// Last observed state of the connection to Exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
    #[default]
    Unknown,
}

impl_domain_status_conversions!(ConnectionStatus {
    Connected => "connected",
    Disconnected => "disconnected",
    Unknown => "unknown",
});
