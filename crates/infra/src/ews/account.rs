//! Service account credentials shared by every room client.

use std::sync::Arc;

use chrono::{Duration, Utc};
use roomsync_core::CalendarGateway;
use roomsync_domain::constants::STATUS_AUTHORIZED;
use roomsync_domain::{AuthKind, ConnectionStatus, EwsConfig, Result, RoomSyncError, TimeWindow};
use tracing::{debug, warn};

use super::auth::{EwsAuth, TokenProvider};
use super::client::EwsClient;

/// The account RoomSync signs in as.
///
/// Room mailboxes are reached by impersonating them (or, failing that, by
/// delegate access) from this one account.
#[derive(Clone)]
pub struct ServiceAccount {
    config: EwsConfig,
    token_provider: Option<Arc<dyn TokenProvider>>,
}

impl ServiceAccount {
    /// # Errors
    /// `RoomSyncError::Config` when the credentials for `config.auth` are
    /// missing.
    pub fn from_config(
        config: EwsConfig,
        token_provider: Option<Arc<dyn TokenProvider>>,
    ) -> Result<Self> {
        if config.username.as_deref().map_or(true, str::is_empty) {
            return Err(RoomSyncError::Config("EWS username is required".into()));
        }
        match config.auth {
            AuthKind::Basic if config.password.is_none() => {
                Err(RoomSyncError::Config("basic auth requires a password".into()))
            }
            AuthKind::OAuth if token_provider.is_none() => {
                Err(RoomSyncError::Config("oauth auth requires a token provider".into()))
            }
            _ => Ok(Self { config, token_provider }),
        }
    }

    pub fn basic(config: EwsConfig) -> Result<Self> {
        Self::from_config(EwsConfig { auth: AuthKind::Basic, ..config }, None)
    }

    pub fn oauth(config: EwsConfig, provider: Arc<dyn TokenProvider>) -> Result<Self> {
        Self::from_config(EwsConfig { auth: AuthKind::OAuth, ..config }, Some(provider))
    }

    pub fn config(&self) -> &EwsConfig {
        &self.config
    }

    fn auth(&self) -> Result<EwsAuth> {
        match (&self.config.auth, &self.token_provider) {
            (AuthKind::OAuth, Some(provider)) => Ok(EwsAuth::OAuth(Arc::clone(provider))),
            (AuthKind::OAuth, None) => {
                Err(RoomSyncError::Config("oauth auth requires a token provider".into()))
            }
            (AuthKind::Basic, _) => Ok(EwsAuth::Basic {
                username: self.config.username.clone().unwrap_or_default(),
                password: self.config.password.clone().unwrap_or_default(),
            }),
        }
    }

    /// Client acting as this account, without impersonation.
    pub fn client(&self) -> Result<EwsClient> {
        let config = EwsConfig { impersonation: None, ..self.config.clone() };
        EwsClient::new(&config, self.auth()?)
    }

    /// Client that impersonates `room_email`.
    pub fn room_client(&self, room_email: &str) -> Result<EwsClient> {
        let config =
            EwsConfig { impersonation: Some(room_email.to_string()), ..self.config.clone() };
        debug!(room = room_email, "creating room client");
        EwsClient::new(&config, self.auth()?)
    }

    /// `"Authorized"` when credentials work, otherwise a description of the
    /// failure.
    ///
    /// OAuth accounts only need a token. Basic accounts make one request
    /// against their own calendar.
    pub async fn check_status(&self) -> String {
        match self.probe().await {
            Ok(ConnectionStatus::Connected) => STATUS_AUTHORIZED.to_string(),
            Ok(status) => status.to_string(),
            Err(err) => {
                warn!(error = %err, "service account check failed");
                err.to_string()
            }
        }
    }

    async fn probe(&self) -> Result<ConnectionStatus> {
        if let Some(provider) = &self.token_provider {
            if self.config.auth == AuthKind::OAuth {
                provider.access_token().await?;
                return Ok(ConnectionStatus::Connected);
            }
        }

        let client = self.client()?;
        let now = Utc::now();
        let window = TimeWindow::around(now, Duration::hours(1), Duration::hours(1));
        let username = self.config.username.clone().unwrap_or_default();
        client.fetch_snapshot(&username, &window).await?;
        Ok(client.connection_status())
    }
}

impl std::fmt::Debug for ServiceAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccount")
            .field("config", &self.config)
            .field("token_provider", &self.token_provider.as_ref().map(|_| "***"))
            .finish()
    }
}
