//! In-memory token cache mirroring the durable store

use std::sync::Arc;

use log::{debug, info};
use serde::Serialize;
use tokio::sync::{OnceCell, RwLock};

use super::jwt::decode_expiry;
use crate::error::ClientResult;
use crate::store::{TokenKey, TokenStore};

/// The credential pair plus the decoded access token expiry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Credentials {
    /// Short-lived bearer credential
    pub access_token: Option<String>,

    /// Longer-lived credential used only to mint access tokens
    pub refresh_token: Option<String>,

    /// Epoch seconds decoded from the access token, `None` when undecodable
    pub access_expiry: Option<i64>,
}

/// Process-wide token state.
///
/// Hydrated from the durable store on first use; afterwards every read is
/// served from memory. Writes go to the durable store and the cache under
/// the same write lock, and return only once the durable write finished.
pub struct TokenCache {
    store: Arc<dyn TokenStore>,
    state: RwLock<Credentials>,
    loaded: OnceCell<()>,
}

impl TokenCache {
    /// Create a cache over a durable store. Nothing is read until first use.
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self {
            store,
            state: RwLock::new(Credentials::default()),
            loaded: OnceCell::new(),
        }
    }

    /// Hydrate the cache from the durable store. Idempotent.
    pub async fn load(&self) -> ClientResult<()> {
        self.loaded
            .get_or_try_init(|| async {
                let access_token = self.store.get(TokenKey::Access).await?;
                let refresh_token = self.store.get(TokenKey::Refresh).await?;
                let access_expiry = self
                    .store
                    .get(TokenKey::AccessExpiry)
                    .await?
                    .and_then(|v| v.parse::<i64>().ok())
                    .or_else(|| access_token.as_deref().and_then(decode_expiry));

                debug!(
                    "Loaded credentials (access: {}, refresh: {})",
                    access_token.is_some(),
                    refresh_token.is_some()
                );

                *self.state.write().await = Credentials {
                    access_token,
                    refresh_token,
                    access_expiry,
                };
                Ok::<(), crate::error::ClientError>(())
            })
            .await?;
        Ok(())
    }

    /// Copy of the current credentials
    pub async fn snapshot(&self) -> ClientResult<Credentials> {
        self.load().await?;
        Ok(self.state.read().await.clone())
    }

    /// Current access token
    pub async fn access_token(&self) -> ClientResult<Option<String>> {
        self.load().await?;
        Ok(self.state.read().await.access_token.clone())
    }

    /// Current refresh token
    pub async fn refresh_token(&self) -> ClientResult<Option<String>> {
        self.load().await?;
        Ok(self.state.read().await.refresh_token.clone())
    }

    /// Decoded expiry of the current access token
    pub async fn access_expiry(&self) -> ClientResult<Option<i64>> {
        self.load().await?;
        Ok(self.state.read().await.access_expiry)
    }

    /// Whether a refresh token is available
    pub async fn has_refresh_token(&self) -> ClientResult<bool> {
        self.load().await?;
        Ok(self.state.read().await.refresh_token.is_some())
    }

    /// Persist a new access token and, when given, a new refresh token.
    ///
    /// A `None` refresh token keeps the stored one.
    pub async fn save_tokens(&self, access: &str, refresh: Option<&str>) -> ClientResult<Credentials> {
        self.load().await?;
        let mut state = self.state.write().await;

        self.write_access(&mut state, access).await?;
        if let Some(refresh) = refresh {
            self.write_refresh(&mut state, refresh).await?;
        }
        info!(
            "Stored new access token (expiry known: {}, refresh rotated: {})",
            state.access_expiry.is_some(),
            refresh.is_some()
        );
        Ok(state.clone())
    }

    /// Persist a new access token and its decoded expiry
    pub async fn set_access_token(&self, access: &str) -> ClientResult<()> {
        self.load().await?;
        let mut state = self.state.write().await;
        self.write_access(&mut state, access).await
    }

    /// Persist a new refresh token
    pub async fn set_refresh_token(&self, refresh: &str) -> ClientResult<()> {
        self.load().await?;
        let mut state = self.state.write().await;
        self.write_refresh(&mut state, refresh).await
    }

    /// The stored expiry is dropped before the token changes and written back
    /// last, so an interrupted write never pairs a token with another token's
    /// expiry; `load` decodes a missing expiry from the token itself.
    async fn write_access(&self, state: &mut Credentials, access: &str) -> ClientResult<()> {
        let expiry = decode_expiry(access);
        self.store.remove(TokenKey::AccessExpiry).await?;
        self.store.set(TokenKey::Access, access).await?;
        state.access_token = Some(access.to_string());
        state.access_expiry = expiry;

        if let Some(exp) = expiry {
            self.store.set(TokenKey::AccessExpiry, &exp.to_string()).await?;
        }
        Ok(())
    }

    async fn write_refresh(&self, state: &mut Credentials, refresh: &str) -> ClientResult<()> {
        self.store.set(TokenKey::Refresh, refresh).await?;
        state.refresh_token = Some(refresh.to_string());
        Ok(())
    }

    /// Remove every stored credential. Succeeds when nothing is stored.
    pub async fn clear(&self) -> ClientResult<()> {
        self.load().await?;
        let mut state = self.state.write().await;
        self.store.clear(&TokenKey::ALL).await?;
        if state.access_token.is_some() || state.refresh_token.is_some() {
            info!("Cleared stored credentials");
        }
        *state = Credentials::default();
        Ok(())
    }
}
