//! Durable key/value storage for credentials
//!
//! The client persists tokens through the [`TokenStore`] trait so the backing
//! store can be swapped: SQLite on disk for real sessions, memory for tests.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;

use crate::error::StoreError;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

type Result<T> = std::result::Result<T, StoreError>;

/// Keys under which credential material is persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKey {
    /// Access token string
    Access,
    /// Refresh token string
    Refresh,
    /// Decoded access token expiry (epoch seconds)
    AccessExpiry,
}

impl TokenKey {
    /// Every key owned by the client, used when clearing a session.
    pub const ALL: [TokenKey; 3] = [TokenKey::Access, TokenKey::Refresh, TokenKey::AccessExpiry];

    /// Stable storage name for this key
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKey::Access => "auth.access_token",
            TokenKey::Refresh => "auth.refresh_token",
            TokenKey::AccessExpiry => "auth.access_expiry",
        }
    }
}

/// Durable string store
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Read a value, `None` when absent
    async fn get(&self, key: TokenKey) -> Result<Option<String>>;

    /// Write a value, replacing any previous one
    async fn set(&self, key: TokenKey, value: &str) -> Result<()>;

    /// Delete a value; deleting an absent key succeeds
    async fn remove(&self, key: TokenKey) -> Result<()>;

    /// Delete several values at once
    async fn clear(&self, keys: &[TokenKey]) -> Result<()> {
        for key in keys {
            self.remove(*key).await?;
        }
        Ok(())
    }
}
