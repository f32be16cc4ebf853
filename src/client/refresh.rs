//! Single-flight access token refresh
//!
//! However many callers ask for a refresh at once, only one `token/refresh/`
//! call is in flight and every caller receives its outcome. The exchange runs
//! on its own task, so a caller that times out or is dropped never cancels the
//! refresh other callers are waiting on.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use log::{debug, warn};
use reqwest::Client as HttpClient;
use reqwest::header::ACCEPT;

use super::models::{RefreshRequest, TokenGrant};
use super::tokens::TokenCache;
use crate::error::{ClientError, ClientResult};

type SharedRefresh = Shared<BoxFuture<'static, ClientResult<String>>>;

/// Refresh slot state
enum RefreshState {
    Idle,
    Refreshing(SharedRefresh),
}

/// Resets the slot to `Idle` when the refresh task ends, however it ends.
struct ResetOnDrop(Arc<Mutex<RefreshState>>);

impl Drop for ResetOnDrop {
    fn drop(&mut self) {
        let mut slot = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = RefreshState::Idle;
    }
}

/// Exchanges the refresh token for a new access token, one call at a time
pub struct RefreshCoordinator {
    http: HttpClient,
    refresh_url: String,
    timeout: Duration,
    tokens: Arc<TokenCache>,
    slot: Arc<Mutex<RefreshState>>,
}

impl RefreshCoordinator {
    /// Create a coordinator posting to `refresh_url`
    pub fn new(
        http: HttpClient,
        refresh_url: String,
        timeout: Duration,
        tokens: Arc<TokenCache>,
    ) -> Self {
        Self {
            http,
            refresh_url,
            timeout,
            tokens,
            slot: Arc::new(Mutex::new(RefreshState::Idle)),
        }
    }

    /// Whether a refresh call is currently in flight
    pub fn is_refreshing(&self) -> bool {
        let slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        matches!(*slot, RefreshState::Refreshing(_))
    }

    /// Obtain a new access token, joining the in-flight refresh if there is one.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn refresh_once(&self) -> ClientResult<String> {
        let shared = {
            let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
            match &*slot {
                RefreshState::Refreshing(shared) => {
                    debug!("Joining in-flight token refresh");
                    shared.clone()
                }
                RefreshState::Idle => {
                    let shared = self.start();
                    *slot = RefreshState::Refreshing(shared.clone());
                    shared
                }
            }
        };
        shared.await
    }

    /// Spawn the refresh exchange. Called with the slot lock held, so the
    /// task's reset cannot run before the slot records it.
    fn start(&self) -> SharedRefresh {
        let exchange = RefreshExchange {
            http: self.http.clone(),
            url: self.refresh_url.clone(),
            timeout: self.timeout,
            tokens: Arc::clone(&self.tokens),
        };
        let reset = ResetOnDrop(Arc::clone(&self.slot));

        let handle = tokio::spawn(async move {
            let _reset = reset;
            exchange.run().await
        });

        async move {
            handle.await.unwrap_or_else(|e| {
                Err(ClientError::transport(format!("token refresh task failed: {}", e)))
            })
        }
        .boxed()
        .shared()
    }
}

/// One refresh network exchange
struct RefreshExchange {
    http: HttpClient,
    url: String,
    timeout: Duration,
    tokens: Arc<TokenCache>,
}

impl RefreshExchange {
    async fn run(self) -> ClientResult<String> {
        let Some(refresh) = self.tokens.refresh_token().await? else {
            debug!("No refresh token available, skipping refresh call");
            return Err(ClientError::missing_refresh_token());
        };

        debug!("Refreshing access token");
        let response = self
            .http
            .post(&self.url)
            .timeout(self.timeout)
            .header(ACCEPT, "application/json")
            .json(&RefreshRequest { refresh: &refresh })
            .send()
            .await
            .map_err(|e| {
                let err = ClientError::from(e);
                warn!("Token refresh did not reach the server: {}", err);
                err
            })?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!("Refresh token rejected (HTTP {})", status.as_u16());
            self.discard_tokens().await;
            return Err(ClientError::from_response(status.as_u16(), &body).with_logout());
        }

        let grant = TokenGrant::parse(&body).unwrap_or_default();
        let Some(access) = grant.access_token() else {
            warn!("Refresh response carried no access token");
            self.discard_tokens().await;
            return Err(ClientError::invalid_response(
                status.as_u16(),
                "refresh response did not include an access token",
                &body,
            )
            .with_logout());
        };

        self.tokens.save_tokens(access, grant.refresh_token()).await?;
        debug!("Access token refreshed");
        Ok(access.to_string())
    }

    async fn discard_tokens(&self) {
        if let Err(e) = self.tokens.clear().await {
            warn!("Failed to clear rejected credentials: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::store::{MemoryStore, TokenKey};
    use futures::future::join_all;
    use mockito::Matcher;
    use serde_json::json;

    async fn coordinator(url: String, store: &MemoryStore) -> (RefreshCoordinator, Arc<TokenCache>) {
        let tokens = Arc::new(TokenCache::new(Arc::new(store.clone())));
        let coordinator = RefreshCoordinator::new(
            HttpClient::new(),
            url,
            Duration::from_secs(5),
            Arc::clone(&tokens),
        );
        (coordinator, tokens)
    }

    async fn signed_in_store() -> MemoryStore {
        MemoryStore::new()
            .with_value(TokenKey::Access, "A1")
            .await
            .with_value(TokenKey::Refresh, "R1")
            .await
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_refresh() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/token/refresh/")
            .match_body(Matcher::Json(json!({ "refresh": "R1" })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access": "A2"}"#)
            .expect(1)
            .create_async()
            .await;

        let store = signed_in_store().await;
        let (coordinator, tokens) =
            coordinator(format!("{}/token/refresh/", server.url()), &store).await;

        let results = join_all((0..8).map(|_| coordinator.refresh_once())).await;

        mock.assert_async().await;
        for result in results {
            assert_eq!(result.unwrap(), "A2");
        }
        assert_eq!(tokens.access_token().await.unwrap(), Some("A2".to_string()));
        assert!(!coordinator.is_refreshing());
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_failure() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/token/refresh/")
            .with_status(401)
            .with_body(r#"{"detail": "Token is invalid or expired"}"#)
            .expect(1)
            .create_async()
            .await;

        let store = signed_in_store().await;
        let (coordinator, _tokens) =
            coordinator(format!("{}/token/refresh/", server.url()), &store).await;

        let results = join_all((0..4).map(|_| coordinator.refresh_once())).await;

        mock.assert_async().await;
        for result in results {
            let err = result.unwrap_err();
            assert_eq!(err.status, 401);
            assert!(err.logout);
            assert_eq!(err.message, "Token is invalid or expired");
        }
    }

    #[tokio::test]
    async fn test_slot_resets_after_completion() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/token/refresh/")
            .with_status(200)
            .with_body(r#"{"access": "A2"}"#)
            .expect(2)
            .create_async()
            .await;

        let store = signed_in_store().await;
        let (coordinator, _tokens) =
            coordinator(format!("{}/token/refresh/", server.url()), &store).await;

        coordinator.refresh_once().await.unwrap();
        assert!(!coordinator.is_refreshing());
        coordinator.refresh_once().await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_dropped_waiter_does_not_cancel_refresh() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/token/refresh/")
            .with_status(200)
            .with_body(r#"{"access": "A2"}"#)
            .expect(1)
            .create_async()
            .await;

        let store = signed_in_store().await;
        let (coordinator, tokens) =
            coordinator(format!("{}/token/refresh/", server.url()), &store).await;

        // Give up on the refresh almost immediately; the exchange keeps running
        let _ = tokio::time::timeout(Duration::from_micros(1), coordinator.refresh_once()).await;

        for _ in 0..500 {
            if !coordinator.is_refreshing() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert!(!coordinator.is_refreshing());
        mock.assert_async().await;
        assert_eq!(tokens.access_token().await.unwrap(), Some("A2".to_string()));
        assert_eq!(store.peek(TokenKey::Access).await, Some("A2".to_string()));
    }

    #[tokio::test]
    async fn test_missing_refresh_token_skips_network() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/token/refresh/")
            .expect(0)
            .create_async()
            .await;

        let store = MemoryStore::new().with_value(TokenKey::Access, "A1").await;
        let (coordinator, _tokens) =
            coordinator(format!("{}/token/refresh/", server.url()), &store).await;

        let err = coordinator.refresh_once().await.unwrap_err();

        mock.assert_async().await;
        assert_eq!(err.status, 401);
        assert!(err.logout);
    }

    #[tokio::test]
    async fn test_rejection_clears_tokens() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/token/refresh/")
            .with_status(400)
            .with_body(r#"{"detail": "Token is blacklisted"}"#)
            .create_async()
            .await;

        let store = signed_in_store().await;
        let (coordinator, tokens) =
            coordinator(format!("{}/token/refresh/", server.url()), &store).await;

        let err = coordinator.refresh_once().await.unwrap_err();

        assert_eq!(err.status, 400);
        assert!(err.logout);
        assert!(!tokens.has_refresh_token().await.unwrap());
        assert_eq!(store.peek(TokenKey::Refresh).await, None);
        assert_eq!(store.peek(TokenKey::Access).await, None);
    }

    #[tokio::test]
    async fn test_success_without_access_is_rejection() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/token/refresh/")
            .with_status(200)
            .with_body(r#"{"refresh": "R2"}"#)
            .create_async()
            .await;

        let store = signed_in_store().await;
        let (coordinator, tokens) =
            coordinator(format!("{}/token/refresh/", server.url()), &store).await;

        let err = coordinator.refresh_once().await.unwrap_err();

        assert_eq!(err.kind, ErrorKind::InvalidResponse);
        assert!(err.logout);
        assert!(!tokens.has_refresh_token().await.unwrap());
    }

    #[tokio::test]
    async fn test_rotated_refresh_token_is_stored() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/token/refresh/")
            .with_status(200)
            .with_body(r#"{"access": "A2", "refresh": "R2"}"#)
            .create_async()
            .await;

        let store = signed_in_store().await;
        let (coordinator, tokens) =
            coordinator(format!("{}/token/refresh/", server.url()), &store).await;

        coordinator.refresh_once().await.unwrap();

        assert_eq!(tokens.refresh_token().await.unwrap(), Some("R2".to_string()));
        assert_eq!(store.peek(TokenKey::Refresh).await, Some("R2".to_string()));
    }

    #[tokio::test]
    async fn test_static_refresh_token_is_kept() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/token/refresh/")
            .with_status(200)
            .with_body(r#"{"token": "A2"}"#)
            .create_async()
            .await;

        let store = signed_in_store().await;
        let (coordinator, tokens) =
            coordinator(format!("{}/token/refresh/", server.url()), &store).await;

        assert_eq!(coordinator.refresh_once().await.unwrap(), "A2");
        assert_eq!(tokens.refresh_token().await.unwrap(), Some("R1".to_string()));
    }

    #[tokio::test]
    async fn test_transport_failure_keeps_refresh_token() {
        let closed = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = closed.local_addr().unwrap();
        drop(closed);

        let store = signed_in_store().await;
        let (coordinator, tokens) =
            coordinator(format!("http://{}/token/refresh/", addr), &store).await;

        let err = coordinator.refresh_once().await.unwrap_err();

        assert_eq!(err.status, 0);
        assert!(!err.logout);
        assert!(tokens.has_refresh_token().await.unwrap());
        assert!(!coordinator.is_refreshing());
    }
}
