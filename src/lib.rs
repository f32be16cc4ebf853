//! Wildspot - authenticated client for the Wildspot wildlife API
//!
//! The library keeps a durable session (access and refresh tokens), renews the
//! access token before it expires, recovers from `401` with a single shared
//! refresh and one retry, and normalizes every failure into a
//! [`ClientError`].

pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod store;

pub use client::{ApiClient, ClientConfig, Credentials, MultipartForm, RequestOptions, ResponseBody};
pub use config::Config;
pub use error::{ClientError, ClientResult, Error, ErrorKind, Result};
pub use store::{MemoryStore, SqliteStore, TokenKey, TokenStore};
