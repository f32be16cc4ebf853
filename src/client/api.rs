//! Authenticated request executor

use std::sync::Arc;

use log::{debug, info, warn};
use reqwest::header::ACCEPT;
use reqwest::{Client as HttpClient, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use super::jwt::needs_renewal;
use super::models::TokenGrant;
use super::refresh::RefreshCoordinator;
use super::request::{RequestBody, RequestOptions, ResponseBody, join_url};
use super::tokens::{Credentials, TokenCache};
use super::{ClientConfig, LOGIN_PATH, REFRESH_PATH};
use crate::error::{ClientError, ClientResult};
use crate::store::TokenStore;

/// Wildspot API client
pub struct ApiClient {
    http: HttpClient,
    config: ClientConfig,
    tokens: Arc<TokenCache>,
    refresher: RefreshCoordinator,
}

impl ApiClient {
    /// Create a client persisting credentials in `store`
    pub fn new(config: ClientConfig, store: Arc<dyn TokenStore>) -> ClientResult<Self> {
        let http = HttpClient::builder()
            .user_agent(concat!("wildspot/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let tokens = Arc::new(TokenCache::new(store));
        let refresher = RefreshCoordinator::new(
            http.clone(),
            join_url(&config.base_url, REFRESH_PATH),
            config.timeout,
            Arc::clone(&tokens),
        );

        Ok(Self {
            http,
            config,
            tokens,
            refresher,
        })
    }

    /// Configured base URL
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Absolute URL for an API path
    pub fn resolve_url(&self, path: &str) -> String {
        join_url(&self.config.base_url, path)
    }

    /// Current credentials
    pub async fn credentials(&self) -> ClientResult<Credentials> {
        self.tokens.snapshot().await
    }

    /// Current access token
    pub async fn access_token(&self) -> ClientResult<Option<String>> {
        self.tokens.access_token().await
    }

    /// Whether a refresh token is available
    pub async fn has_refresh_token(&self) -> ClientResult<bool> {
        self.tokens.has_refresh_token().await
    }

    /// Sign in with email and password, replacing any stored session
    pub async fn login(&self, email: &str, password: &str) -> ClientResult<Credentials> {
        let options =
            RequestOptions::post(json!({ "email": email, "password": password })).without_auth();
        let (status, body) = self.execute(LOGIN_PATH, &options).await?;

        let grant = match &body {
            ResponseBody::Json(value) => {
                serde_json::from_value::<TokenGrant>(value.clone()).unwrap_or_default()
            }
            _ => TokenGrant::default(),
        };
        let Some(access) = grant.access_token() else {
            return Err(ClientError::invalid_response(
                status.as_u16(),
                "login response did not include an access token",
                &body.into_json().to_string(),
            ));
        };

        self.tokens.clear().await?;
        let credentials = self.tokens.save_tokens(access, grant.refresh_token()).await?;
        info!("Signed in");
        Ok(credentials)
    }

    /// Forget the stored session. Succeeds when already signed out.
    pub async fn logout(&self) -> ClientResult<()> {
        self.tokens.clear().await?;
        info!("Signed out");
        Ok(())
    }

    /// Exchange the refresh token for a new access token now
    pub async fn refresh(&self) -> ClientResult<String> {
        match self.refresher.refresh_once().await {
            Err(err) if err.logout => {
                self.discard_tokens().await;
                Err(err)
            }
            result => result,
        }
    }

    /// Perform an API call.
    ///
    /// With `auth` set, an access token about to expire is renewed first and a
    /// 401 triggers one refresh followed by exactly one retry.
    pub async fn request(&self, path: &str, options: RequestOptions) -> ClientResult<ResponseBody> {
        let (_, body) = self.execute(path, &options).await?;
        Ok(body)
    }

    /// Authenticated call whose JSON response is deserialized into `T`
    pub async fn auth_fetch<T: DeserializeOwned>(
        &self,
        path: &str,
        mut options: RequestOptions,
    ) -> ClientResult<T> {
        options.auth = true;
        let (status, body) = self.execute(path, &options).await?;
        let value = body.into_json();
        serde_json::from_value(value.clone()).map_err(|e| {
            ClientError::invalid_response(
                status.as_u16(),
                format!("unexpected response: {}", e),
                &value.to_string(),
            )
        })
    }

    /// Authenticated GET returning JSON
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        self.auth_fetch(path, RequestOptions::get()).await
    }

    /// Authenticated POST of a JSON body returning JSON
    pub async fn post_json<T: DeserializeOwned>(&self, path: &str, body: Value) -> ClientResult<T> {
        self.auth_fetch(path, RequestOptions::post(body)).await
    }

    async fn execute(
        &self,
        path: &str,
        options: &RequestOptions,
    ) -> ClientResult<(StatusCode, ResponseBody)> {
        let url = self.resolve_url(path);

        let token = if options.auth {
            self.renew_if_expiring().await?;
            self.tokens.access_token().await?
        } else {
            None
        };

        let mut response = self.send(&url, options, token.as_deref()).await?;

        if response.status() == StatusCode::UNAUTHORIZED && options.auth {
            debug!("{} {} returned 401, renewing session", options.method, path);
            let renewed = self.recover_unauthorized(token.as_deref()).await?;
            response = self.send(&url, options, Some(&renewed)).await?;
        }

        self.finish(response, options.auth).await
    }

    /// Renew up front when the token is known to expire within the leeway.
    /// A failure here is not fatal: the request itself still gets 401 handling.
    async fn renew_if_expiring(&self) -> ClientResult<()> {
        let expiry = self.tokens.access_expiry().await?;
        if needs_renewal(expiry, self.config.expiry_leeway_secs) {
            debug!(
                "Access token expires within {}s, renewing before request",
                self.config.expiry_leeway_secs
            );
            if let Err(err) = self.refresher.refresh_once().await {
                debug!("Pre-emptive renewal failed, continuing: {}", err);
            }
        }
        Ok(())
    }

    /// Token to retry a 401 with. `sent` is the token the failed request carried.
    async fn recover_unauthorized(&self, sent: Option<&str>) -> ClientResult<String> {
        // Another request may have renewed the token while this one was in flight
        if let Some(current) = self
            .tokens
            .access_token()
            .await?
            .filter(|current| Some(current.as_str()) != sent)
        {
            debug!("Access token renewed concurrently, retrying with it");
            return Ok(current);
        }

        match self.refresher.refresh_once().await {
            Ok(token) => Ok(token),
            Err(err) if err.logout => {
                warn!("Session could not be renewed, signing out");
                self.discard_tokens().await;
                Err(ClientError::session_expired(Some(&err)))
            }
            Err(err) => Err(err),
        }
    }

    async fn send(
        &self,
        url: &str,
        options: &RequestOptions,
        token: Option<&str>,
    ) -> ClientResult<Response> {
        let upload = options.is_upload();
        let timeout = options.timeout.unwrap_or(if upload {
            self.config.upload_timeout
        } else {
            self.config.timeout
        });

        let mut builder = self
            .http
            .request(options.method.clone(), url)
            .timeout(timeout)
            .header(ACCEPT, "application/json");

        for (name, value) in &options.headers {
            // multipart needs the boundary the HTTP stack generates
            if upload && name.eq_ignore_ascii_case("content-type") {
                continue;
            }
            builder = builder.header(name.as_str(), value.as_str());
        }

        builder = match &options.body {
            None => builder,
            Some(RequestBody::Json(value)) => builder.json(value),
            Some(RequestBody::Multipart(form)) => builder.multipart(form.to_form()?),
        };

        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }

        Ok(builder.send().await?)
    }

    async fn finish(
        &self,
        response: Response,
        auth: bool,
    ) -> ClientResult<(StatusCode, ResponseBody)> {
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            return Ok((status, ResponseBody::parse(status, body)));
        }

        let mut err = ClientError::from_response(status.as_u16(), &body);
        if status == StatusCode::UNAUTHORIZED && auth {
            warn!("Request still unauthorized after renewal, signing out");
            self.discard_tokens().await;
        } else {
            debug!("Request failed with HTTP {}", status.as_u16());
            // The stored session played no part in an unauthenticated call
            err.logout = false;
        }
        Err(err)
    }

    async fn discard_tokens(&self) {
        if let Err(e) = self.tokens.clear().await {
            warn!("Failed to clear credentials: {}", e);
        }
    }
}
