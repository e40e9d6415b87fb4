use crate::store::ProfileStore;
use crate::types::PushEndpoint;
use anyhow::Result;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing;

/// Read-through cache over the per-user push endpoints. Every component
/// that needs an endpoint goes through this object; there is no other
/// shared endpoint state.
///
/// Also tracks the consecutive ambiguous-404 count per user, which the
/// lifecycle manager uses to decide when a transient "not found" has
/// repeated often enough to treat the endpoint as gone.
#[derive(Clone, Default)]
pub struct EndpointCache {
    endpoints: Arc<RwLock<HashMap<String, PushEndpoint>>>,
    transient_not_found: Arc<RwLock<HashMap<String, u32>>>,
}

impl EndpointCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache-only lookup, no store fallback.
    pub fn peek(&self, user_id: &str) -> Option<PushEndpoint> {
        self.endpoints
            .read()
            .expect("endpoint cache poisoned")
            .get(user_id)
            .cloned()
    }

    /// Resolve the endpoint for a user: cache hit, else load from the
    /// store and cache the result. A missing endpoint is not an error.
    pub async fn get(
        &self,
        store: &dyn ProfileStore,
        user_id: &str,
    ) -> Result<Option<PushEndpoint>> {
        if let Some(endpoint) = self.peek(user_id) {
            return Ok(Some(endpoint));
        }

        let loaded = store.load_endpoint(user_id).await?;
        if let Some(endpoint) = &loaded {
            tracing::debug!("Cached endpoint for user {} from store", user_id);
            self.insert(endpoint.clone());
        }
        Ok(loaded)
    }

    pub fn insert(&self, endpoint: PushEndpoint) {
        self.endpoints
            .write()
            .expect("endpoint cache poisoned")
            .insert(endpoint.user_id.clone(), endpoint);
    }

    pub fn purge(&self, user_id: &str) {
        self.endpoints
            .write()
            .expect("endpoint cache poisoned")
            .remove(user_id);
        self.transient_not_found
            .write()
            .expect("failure counter poisoned")
            .remove(user_id);
    }

    /// Record one ambiguous not-found delivery response; returns the new
    /// consecutive count.
    pub fn note_transient_not_found(&self, user_id: &str) -> u32 {
        let mut counts = self
            .transient_not_found
            .write()
            .expect("failure counter poisoned");
        let count = counts.entry(user_id.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    /// Any successful or non-404 outcome breaks the consecutive run.
    pub fn reset_transient_not_found(&self, user_id: &str) {
        self.transient_not_found
            .write()
            .expect("failure counter poisoned")
            .remove(user_id);
    }

    pub fn len(&self) -> usize {
        self.endpoints
            .read()
            .expect("endpoint cache poisoned")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryProfileStore;
    use crate::types::{EndpointState, PushCrypto};

    fn endpoint(user_id: &str) -> PushEndpoint {
        PushEndpoint {
            user_id: user_id.to_string(),
            transport_address: "https://push.example/send/abc".to_string(),
            crypto: PushCrypto {
                p256dh: "p256dh-key".to_string(),
                auth: "auth-secret".to_string(),
            },
            state: EndpointState::Active,
        }
    }

    #[tokio::test]
    async fn get_falls_back_to_store_and_caches() {
        let store = MemoryProfileStore::new();
        store.put_endpoint(endpoint("u1"));
        let cache = EndpointCache::new();

        assert!(cache.peek("u1").is_none());
        let resolved = cache.get(&store, "u1").await.unwrap();
        assert!(resolved.is_some());
        // Second lookup is served from the cache.
        assert!(cache.peek("u1").is_some());
    }

    #[tokio::test]
    async fn get_reports_missing_endpoint_as_none() {
        let store = MemoryProfileStore::new();
        let cache = EndpointCache::new();
        assert!(cache.get(&store, "nobody").await.unwrap().is_none());
    }

    #[test]
    fn transient_not_found_counter_runs_and_resets() {
        let cache = EndpointCache::new();
        assert_eq!(cache.note_transient_not_found("u1"), 1);
        assert_eq!(cache.note_transient_not_found("u1"), 2);
        cache.reset_transient_not_found("u1");
        assert_eq!(cache.note_transient_not_found("u1"), 1);
    }

    #[test]
    fn purge_clears_endpoint_and_counter() {
        let cache = EndpointCache::new();
        cache.insert(endpoint("u1"));
        cache.note_transient_not_found("u1");
        cache.purge("u1");
        assert!(cache.peek("u1").is_none());
        assert_eq!(cache.note_transient_not_found("u1"), 1);
    }
}
