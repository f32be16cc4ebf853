//! Command execution context
//!
//! Loads configuration once and opens the token store so individual commands
//! only deal with their own work.

use std::path::PathBuf;
use std::sync::Arc;

use crate::cli::Cli;
use crate::client::{ApiClient, TokenCache};
use crate::config::Config;
use crate::error::Result;
use crate::store::{SqliteStore, TokenStore};

/// Shared state for a single command invocation
pub struct CommandContext {
    /// Loaded configuration with overrides applied
    pub config: Config,
    /// Where the configuration was read from
    pub config_path: PathBuf,
    /// Durable token storage
    pub store: Arc<SqliteStore>,
}

impl CommandContext {
    /// Load config (defaults when the file is missing) and open the token store
    pub fn new(cli: &Cli) -> Result<Self> {
        let config_path = Config::resolve_path(cli.config.as_deref())?;
        let config = Config::load_or_default(&config_path)?
            .with_api_url_override(cli.api_url.as_deref());

        let store = match &config.token_store {
            Some(path) => SqliteStore::open_at(path)?,
            None => SqliteStore::open()?,
        };
        log::debug!("Token store at {}", store.path().display());

        Ok(Self {
            config,
            config_path,
            store: Arc::new(store),
        })
    }

    /// Token cache over the store, for commands that never touch the network
    pub fn tokens(&self) -> TokenCache {
        TokenCache::new(self.store_handle())
    }

    /// Build the API client; fails when no API URL is configured
    pub fn client(&self) -> Result<ApiClient> {
        let client_config = self.config.client_config()?;
        Ok(ApiClient::new(client_config, self.store_handle())?)
    }

    fn store_handle(&self) -> Arc<dyn TokenStore> {
        self.store.clone()
    }
}
