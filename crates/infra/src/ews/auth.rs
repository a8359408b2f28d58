//! Request authentication for EWS.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::RequestBuilder;
use roomsync_domain::{Result, RoomSyncError};

/// Source of OAuth bearer tokens.
///
/// Token acquisition and refresh live outside this crate; implementations
/// return a currently valid token.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<String>;
}

/// A fixed token, for tests and short-lived tools.
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<String> {
        if self.token.is_empty() {
            return Err(RoomSyncError::Auth("empty access token".into()));
        }
        Ok(self.token.clone())
    }
}

#[derive(Clone)]
pub enum EwsAuth {
    Basic { username: String, password: String },
    OAuth(Arc<dyn TokenProvider>),
}

impl EwsAuth {
    pub async fn apply(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        match self {
            Self::Basic { username, password } => Ok(request.basic_auth(username, Some(password))),
            Self::OAuth(provider) => {
                let token = provider.access_token().await?;
                Ok(request.bearer_auth(token))
            }
        }
    }
}

impl std::fmt::Debug for EwsAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"***")
                .finish(),
            Self::OAuth(_) => f.debug_tuple("OAuth").field(&"***").finish(),
        }
    }
}
