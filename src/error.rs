//! Error types for the Wildspot client

use serde_json::Value;
use thiserror::Error;

/// Result type alias for configuration and CLI operations
pub type Result<T> = std::result::Result<T, Error>;

/// Result type alias for API client operations
pub type ClientResult<T> = std::result::Result<T, ClientError>;

/// Message surfaced when a request exceeds its timeout
pub const TIMEOUT_MESSAGE: &str = "request timed out";

/// Message surfaced when the server cannot be reached at all
pub const CONNECT_MESSAGE: &str = "cannot reach server";

/// Message surfaced when the session can no longer be renewed
pub const SESSION_EXPIRED_MESSAGE: &str = "session expired, please sign in again";

/// Top-level error type for the application
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Interactive prompt error: {0}")]
    Dialoguer(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Operation failed: {0}")]
    Other(String),
}

impl From<dialoguer::Error> for Error {
    fn from(err: dialoguer::Error) -> Self {
        Error::Dialoguer(err.to_string())
    }
}

/// Machine-readable classification of a [`ClientError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request exceeded its timeout
    Timeout,
    /// The server could not be reached (DNS, refused connection)
    Connect,
    /// Any other transport-level failure
    Transport,
    /// Authentication failed and could not be recovered
    Unauthorized,
    /// The server answered with a non-success status
    Http,
    /// The server answered successfully but the payload was unusable
    InvalidResponse,
    /// The local token store failed
    Storage,
}

/// Diagnostic payload attached to a [`ClientError`].
///
/// Never shown to users; kept so callers and logs can tell failures apart.
#[derive(Debug, Clone, PartialEq)]
pub enum RawError {
    /// JSON body returned by the server
    Payload(Value),
    /// Non-JSON body returned by the server
    Text(String),
    /// Underlying transport failure description
    Transport(String),
    /// Underlying storage failure description
    Storage(String),
}

/// The single error shape returned by every client operation.
///
/// UI code needs one handling pattern: display `message`, and when `logout`
/// is set, return the user to the signed-out entry point.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ClientError {
    /// User-displayable description
    pub message: String,

    /// HTTP status code, or 0 for transport-level failures
    pub status: u16,

    /// Whether the caller must force the user back to a signed-out state
    pub logout: bool,

    /// Classification of the failure
    pub kind: ErrorKind,

    /// Original payload or underlying failure, for diagnostics only
    pub raw: Option<RawError>,
}

impl ClientError {
    /// Request exceeded its timeout
    pub fn timeout(detail: impl Into<String>) -> Self {
        Self {
            message: TIMEOUT_MESSAGE.to_string(),
            status: 0,
            logout: false,
            kind: ErrorKind::Timeout,
            raw: Some(RawError::Transport(detail.into())),
        }
    }

    /// Server unreachable
    pub fn connect(detail: impl Into<String>) -> Self {
        Self {
            message: CONNECT_MESSAGE.to_string(),
            status: 0,
            logout: false,
            kind: ErrorKind::Connect,
            raw: Some(RawError::Transport(detail.into())),
        }
    }

    /// Other transport failure (malformed URL, broken body stream, TLS)
    pub fn transport(detail: impl Into<String>) -> Self {
        let detail = detail.into();
        Self {
            message: format!("network error: {}", detail),
            status: 0,
            logout: false,
            kind: ErrorKind::Transport,
            raw: Some(RawError::Transport(detail)),
        }
    }

    /// No refresh token is available to renew the session
    pub fn missing_refresh_token() -> Self {
        Self {
            message: SESSION_EXPIRED_MESSAGE.to_string(),
            status: 401,
            logout: true,
            kind: ErrorKind::Unauthorized,
            raw: None,
        }
    }

    /// Session could not be renewed after a 401; carries the refresh failure's payload
    pub fn session_expired(cause: Option<&ClientError>) -> Self {
        Self {
            message: SESSION_EXPIRED_MESSAGE.to_string(),
            status: 401,
            logout: true,
            kind: ErrorKind::Unauthorized,
            raw: cause.and_then(|c| c.raw.clone()),
        }
    }

    /// Build an error from a non-success response body.
    ///
    /// The message comes from a `detail` or `message` string field when the
    /// body is JSON, otherwise a generic description with the status code.
    /// A 401 always forces logout.
    pub fn from_response(status: u16, body: &str) -> Self {
        let raw = raw_from_body(body);
        let message = match &raw {
            Some(RawError::Payload(value)) => message_from_payload(value),
            _ => None,
        }
        .unwrap_or_else(|| format!("request failed (HTTP {})", status));

        let unauthorized = status == 401;
        Self {
            message,
            status,
            logout: unauthorized,
            kind: if unauthorized {
                ErrorKind::Unauthorized
            } else {
                ErrorKind::Http
            },
            raw,
        }
    }

    /// A success response whose payload could not be used
    pub fn invalid_response(status: u16, message: impl Into<String>, body: &str) -> Self {
        Self {
            message: message.into(),
            status,
            logout: false,
            kind: ErrorKind::InvalidResponse,
            raw: raw_from_body(body),
        }
    }

    /// Local credential storage failed
    pub fn storage(detail: impl Into<String>) -> Self {
        Self {
            message: "failed to access local credential storage".to_string(),
            status: 0,
            logout: false,
            kind: ErrorKind::Storage,
            raw: Some(RawError::Storage(detail.into())),
        }
    }

    /// Force logout on this error (used when a refresh is rejected)
    pub fn with_logout(mut self) -> Self {
        self.logout = true;
        self
    }

    /// Whether this error came from the transport rather than a server response
    pub fn is_transport(&self) -> bool {
        self.status == 0
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::timeout(err.to_string())
        } else if err.is_connect() {
            ClientError::connect(err.to_string())
        } else {
            ClientError::transport(err.to_string())
        }
    }
}

impl From<StoreError> for ClientError {
    fn from(err: StoreError) -> Self {
        ClientError::storage(err.to_string())
    }
}

/// Extract a human message from conventional `detail` / `message` fields
pub fn message_from_payload(value: &Value) -> Option<String> {
    ["detail", "message"]
        .iter()
        .filter_map(|field| value.get(field).and_then(Value::as_str))
        .map(str::trim)
        .find(|msg| !msg.is_empty())
        .map(str::to_string)
}

fn raw_from_body(body: &str) -> Option<RawError> {
    if body.trim().is_empty() {
        return None;
    }
    match serde_json::from_str::<Value>(body) {
        Ok(value) => Some(RawError::Payload(value)),
        Err(_) => Some(RawError::Text(body.to_string())),
    }
}

/// Token storage errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Token store database error: {0}")]
    Database(String),

    #[error("Token store I/O error: {0}")]
    Io(String),

    #[error("Could not determine a data directory for the token store")]
    NoDataDir,
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to save configuration: {0}")]
    SaveError(String),

    #[error("API URL not configured. Set `api_url` in the config file or WILDSPOT_API_URL.")]
    MissingApiUrl,
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
