//! In-process token store

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{Result, TokenKey, TokenStore};

/// Token store that lives only as long as the process.
///
/// Clones share the same map, so a clone handed to a second client behaves
/// like reopening the same durable store after a restart.
#[derive(Clone, Default)]
pub struct MemoryStore {
    values: Arc<Mutex<HashMap<TokenKey, String>>>,
    reads: Arc<AtomicUsize>,
    writes: Arc<AtomicUsize>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a value without counting it as a write
    pub async fn with_value(self, key: TokenKey, value: &str) -> Self {
        self.values.lock().await.insert(key, value.to_string());
        self
    }

    /// Current value for a key, bypassing the read counter
    pub async fn peek(&self, key: TokenKey) -> Option<String> {
        self.values.lock().await.get(&key).cloned()
    }

    /// Number of `get` calls served
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of `set`/`remove` calls served
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenStore for MemoryStore {
    async fn get(&self, key: TokenKey) -> Result<Option<String>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.values.lock().await.get(&key).cloned())
    }

    async fn set(&self, key: TokenKey, value: &str) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.values.lock().await.insert(key, value.to_string());
        Ok(())
    }

    async fn remove(&self, key: TokenKey) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.values.lock().await.remove(&key);
        Ok(())
    }
}
