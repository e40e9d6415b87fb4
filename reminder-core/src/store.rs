use crate::config::SettingsApiConfig;
use crate::types::{EndpointState, NotificationProfile, ProfileSnapshot, PushEndpoint};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use tracing;

/// Read model over the preference-owning collaborator. The engine never
/// writes preference data; the only mutation it performs is marking an
/// endpoint removed after a permanent delivery failure.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// All users with notifications enabled or a stored endpoint.
    async fn load_enabled_profiles(&self) -> Result<Vec<ProfileSnapshot>>;

    async fn load_profile(&self, user_id: &str) -> Result<Option<NotificationProfile>>;

    async fn load_endpoint(&self, user_id: &str) -> Result<Option<PushEndpoint>>;

    async fn mark_endpoint_removed(&self, user_id: &str) -> Result<()>;
}

/// HTTP client for the settings API's notification read model.
pub struct HttpProfileStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpProfileStore {
    pub fn new(config: &SettingsApiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| anyhow!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl ProfileStore for HttpProfileStore {
    async fn load_enabled_profiles(&self) -> Result<Vec<ProfileSnapshot>> {
        let response = self
            .client
            .get(self.url("/notification-profiles"))
            .send()
            .await
            .map_err(|e| anyhow!("Failed to reach settings API: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("Settings API returned {} loading profiles", status));
        }

        let snapshots: Vec<ProfileSnapshot> = response
            .json()
            .await
            .map_err(|e| anyhow!("Failed to parse profile snapshot: {}", e))?;

        tracing::debug!("Loaded {} profile snapshots", snapshots.len());
        Ok(snapshots)
    }

    async fn load_profile(&self, user_id: &str) -> Result<Option<NotificationProfile>> {
        let response = self
            .client
            .get(self.url(&format!("/notification-profiles/{}", user_id)))
            .send()
            .await
            .map_err(|e| anyhow!("Failed to reach settings API: {}", e))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("Settings API returned {} loading profile", status));
        }

        Ok(Some(response.json().await?))
    }

    async fn load_endpoint(&self, user_id: &str) -> Result<Option<PushEndpoint>> {
        let response = self
            .client
            .get(self.url(&format!("/push-endpoints/{}", user_id)))
            .send()
            .await
            .map_err(|e| anyhow!("Failed to reach settings API: {}", e))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("Settings API returned {} loading endpoint", status));
        }

        Ok(Some(response.json().await?))
    }

    async fn mark_endpoint_removed(&self, user_id: &str) -> Result<()> {
        let response = self
            .client
            .post(self.url(&format!("/push-endpoints/{}/removed", user_id)))
            .send()
            .await
            .map_err(|e| anyhow!("Failed to reach settings API: {}", e))?;

        let status = response.status();
        if !status.is_success() && status != reqwest::StatusCode::NOT_FOUND {
            return Err(anyhow!(
                "Settings API returned {} marking endpoint removed",
                status
            ));
        }

        Ok(())
    }
}

/// In-process store used for local development and tests.
#[derive(Default)]
pub struct MemoryProfileStore {
    profiles: RwLock<HashMap<String, NotificationProfile>>,
    endpoints: RwLock<HashMap<String, PushEndpoint>>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_profile(&self, profile: NotificationProfile) {
        self.profiles
            .write()
            .expect("profile map poisoned")
            .insert(profile.user_id.clone(), profile);
    }

    pub fn put_endpoint(&self, endpoint: PushEndpoint) {
        self.endpoints
            .write()
            .expect("endpoint map poisoned")
            .insert(endpoint.user_id.clone(), endpoint);
    }

    pub fn remove_user(&self, user_id: &str) {
        self.profiles
            .write()
            .expect("profile map poisoned")
            .remove(user_id);
        self.endpoints
            .write()
            .expect("endpoint map poisoned")
            .remove(user_id);
    }

    pub fn endpoint_state(&self, user_id: &str) -> Option<EndpointState> {
        self.endpoints
            .read()
            .expect("endpoint map poisoned")
            .get(user_id)
            .map(|e| e.state)
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn load_enabled_profiles(&self) -> Result<Vec<ProfileSnapshot>> {
        let profiles = self.profiles.read().expect("profile map poisoned");
        let endpoints = self.endpoints.read().expect("endpoint map poisoned");

        Ok(profiles
            .values()
            .filter(|p| p.enabled || endpoints.contains_key(&p.user_id))
            .map(|p| ProfileSnapshot {
                profile: p.clone(),
                endpoint: endpoints.get(&p.user_id).cloned(),
            })
            .collect())
    }

    async fn load_profile(&self, user_id: &str) -> Result<Option<NotificationProfile>> {
        Ok(self
            .profiles
            .read()
            .expect("profile map poisoned")
            .get(user_id)
            .cloned())
    }

    async fn load_endpoint(&self, user_id: &str) -> Result<Option<PushEndpoint>> {
        Ok(self
            .endpoints
            .read()
            .expect("endpoint map poisoned")
            .get(user_id)
            .cloned())
    }

    async fn mark_endpoint_removed(&self, user_id: &str) -> Result<()> {
        if let Some(endpoint) = self
            .endpoints
            .write()
            .expect("endpoint map poisoned")
            .get_mut(user_id)
        {
            endpoint.state = EndpointState::Removed;
        }
        Ok(())
    }
}
