//! Authenticated Wildspot API client
//!
//! [`ApiClient`] composes the token cache, the single-flight refresh
//! coordinator and expiry estimation into one request executor. UI code only
//! ever sees [`ClientError`](crate::error::ClientError).

use std::time::Duration;

pub mod api;
pub mod jwt;
pub mod models;
pub mod refresh;
pub mod request;
pub mod tokens;

pub use api::ApiClient;
pub use refresh::RefreshCoordinator;
pub use request::{MultipartForm, RequestBody, RequestOptions, ResponseBody, join_url};
pub use tokens::{Credentials, TokenCache};

/// Default timeout for ordinary calls
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Default timeout for multipart uploads
pub const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// Login endpoint, relative to the base URL
pub const LOGIN_PATH: &str = "login/";

/// Refresh endpoint, relative to the base URL
pub const REFRESH_PATH: &str = "token/refresh/";

/// Client settings
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API base URL, e.g. `https://api.example.org/api`
    pub base_url: String,

    /// Timeout for ordinary calls
    pub timeout: Duration,

    /// Timeout for multipart uploads
    pub upload_timeout: Duration,

    /// Seconds before expiry at which the access token is renewed up front
    pub expiry_leeway_secs: i64,
}

impl ClientConfig {
    /// Settings with default timeouts and leeway
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: DEFAULT_TIMEOUT,
            upload_timeout: DEFAULT_UPLOAD_TIMEOUT,
            expiry_leeway_secs: jwt::DEFAULT_EXPIRY_LEEWAY_SECS,
        }
    }

    /// Override the ordinary call timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the upload timeout
    pub fn with_upload_timeout(mut self, timeout: Duration) -> Self {
        self.upload_timeout = timeout;
        self
    }

    /// Override the renewal leeway
    pub fn with_expiry_leeway(mut self, secs: i64) -> Self {
        self.expiry_leeway_secs = secs;
        self
    }
}
