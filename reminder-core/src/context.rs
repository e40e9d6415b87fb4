use crate::cache::EndpointCache;
use crate::config::Config;
use crate::status::StatusBook;
use crate::store::{HttpProfileStore, ProfileStore};
use std::sync::Arc;

/// Shared handle passed to every engine component. The cache and status
/// book are the only mutable shared state; both are internally locked.
#[derive(Clone)]
pub struct EngineContext {
    pub config: Arc<Config>,
    pub store: Arc<dyn ProfileStore>,
    pub cache: EndpointCache,
    pub status: StatusBook,
}

impl EngineContext {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let store = Arc::new(HttpProfileStore::new(&config.settings)?);
        Ok(Self::with_store(config, store))
    }

    /// Build a context around an explicit store implementation (local
    /// development, tests).
    pub fn with_store(config: Config, store: Arc<dyn ProfileStore>) -> Self {
        EngineContext {
            config: Arc::new(config),
            store,
            cache: EndpointCache::new(),
            status: StatusBook::new(),
        }
    }
}
