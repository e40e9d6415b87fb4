use reminder_core::types::{DeliveryOutcome, DispatchResult, ReminderKind};
use reminder_core::EngineContext;
use reminder_schedule::TriggerRegistry;
use tracing;

/// Turns delivery outcomes into endpoint-lifecycle transitions. A
/// permanent failure removes the endpoint from cache and store and
/// disarms the user; a transient failure never mutates endpoint state on
/// a single occurrence.
///
/// The one escalation: the ambiguous 404 provider code. Each consecutive
/// 404 for the same user bumps a counter, and at the configured threshold
/// (default 3) the endpoint is treated as permanently gone.
pub struct EndpointLifecycle {
    ctx: EngineContext,
    registry: TriggerRegistry,
}

impl EndpointLifecycle {
    pub fn new(ctx: EngineContext, registry: TriggerRegistry) -> Self {
        Self { ctx, registry }
    }

    pub async fn apply(
        &self,
        user_id: &str,
        kind: ReminderKind,
        outcome: &DeliveryOutcome,
    ) -> DispatchResult {
        match outcome {
            DeliveryOutcome::Delivered => {
                self.ctx.cache.reset_transient_not_found(user_id);
                tracing::debug!("Delivered {} reminder to user {}", kind, user_id);
                DispatchResult::Delivered
            }
            DeliveryOutcome::PermanentFailure { status, reason } => {
                tracing::warn!(
                    "Permanent delivery failure ({} {}) for user {}, removing endpoint",
                    status,
                    reason,
                    user_id
                );
                self.remove_endpoint(user_id).await;
                DispatchResult::Failure
            }
            DeliveryOutcome::TransientFailure { status: Some(404) } => {
                let count = self.ctx.cache.note_transient_not_found(user_id);
                let threshold = self.ctx.config.push.transient_removal_threshold;
                if count >= threshold {
                    tracing::warn!(
                        "Endpoint for user {} not found {} times in a row, removing",
                        user_id,
                        count
                    );
                    self.remove_endpoint(user_id).await;
                } else {
                    tracing::warn!(
                        "Endpoint for user {} not found ({}/{}), keeping for now",
                        user_id,
                        count,
                        threshold
                    );
                }
                DispatchResult::Failure
            }
            DeliveryOutcome::TransientFailure { status } => {
                // Any other response breaks a consecutive-404 run.
                self.ctx.cache.reset_transient_not_found(user_id);
                if *status == Some(413) {
                    tracing::warn!(
                        "Push payload too large for user {}; payload must shrink before a retry",
                        user_id
                    );
                } else {
                    tracing::warn!(
                        "Transient delivery failure (status {:?}) for user {}",
                        status,
                        user_id
                    );
                }
                DispatchResult::Failure
            }
        }
    }

    async fn remove_endpoint(&self, user_id: &str) {
        self.ctx.cache.purge(user_id);
        self.registry.disarm_user(user_id);
        if let Err(e) = self.ctx.store.mark_endpoint_removed(user_id).await {
            // The cache purge already stops retries; the durable mark
            // will catch up on a later pass.
            tracing::error!(
                "Failed to mark endpoint removed in store for user {}: {}",
                user_id,
                e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reminder_core::config::{Config, PushConfig, ScheduleConfig, ServerConfig, SettingsApiConfig};
    use reminder_core::store::MemoryProfileStore;
    use reminder_core::types::{EndpointState, PushCrypto, PushEndpoint};
    use std::sync::Arc;

    fn test_config() -> Config {
        Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                api_port: 0,
            },
            settings: SettingsApiConfig {
                base_url: "http://localhost:0".to_string(),
                timeout_secs: 1,
            },
            schedule: ScheduleConfig {
                full_reconcile_secs: 3600,
                water_reconcile_secs: 1800,
                default_timezone: "UTC".to_string(),
            },
            push: PushConfig {
                ttl_secs: 60,
                timeout_secs: 1,
                transient_removal_threshold: 3,
            },
        }
    }

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

    fn setup() -> (EndpointLifecycle, EngineContext, Arc<MemoryProfileStore>, TriggerRegistry) {
        let store = Arc::new(MemoryProfileStore::new());
        store.put_endpoint(endpoint("u1"));
        let ctx = EngineContext::with_store(test_config(), store.clone());
        ctx.cache.insert(endpoint("u1"));
        let registry = TriggerRegistry::new();
        let lifecycle = EndpointLifecycle::new(ctx.clone(), registry.clone());
        (lifecycle, ctx, store, registry)
    }

    #[tokio::test]
    async fn permanent_failure_removes_endpoint_everywhere() {
        let (lifecycle, ctx, store, registry) = setup();
        registry.arm(reminder_core::types::CompiledTrigger {
            user_id: "u1".to_string(),
            kind: ReminderKind::Water,
            schedule: reminder_core::types::Schedule::Daily { hour: 8, minute: 0 },
        });

        let result = lifecycle
            .apply(
                "u1",
                ReminderKind::Water,
                &DeliveryOutcome::PermanentFailure {
                    status: 410,
                    reason: "expired",
                },
            )
            .await;

        assert_eq!(result, DispatchResult::Failure);
        assert!(ctx.cache.peek("u1").is_none());
        assert_eq!(store.endpoint_state("u1"), Some(EndpointState::Removed));
        assert_eq!(registry.armed_for("u1").len(), 0);
    }

    #[tokio::test]
    async fn single_transient_failure_leaves_endpoint_alone() {
        let (lifecycle, ctx, store, _registry) = setup();

        lifecycle
            .apply(
                "u1",
                ReminderKind::Breakfast,
                &DeliveryOutcome::TransientFailure { status: Some(500) },
            )
            .await;

        assert!(ctx.cache.peek("u1").is_some());
        assert_eq!(store.endpoint_state("u1"), Some(EndpointState::Active));
    }

    #[tokio::test]
    async fn not_found_escalates_only_after_threshold() {
        let (lifecycle, ctx, store, _registry) = setup();
        let not_found = DeliveryOutcome::TransientFailure { status: Some(404) };

        lifecycle.apply("u1", ReminderKind::Water, &not_found).await;
        lifecycle.apply("u1", ReminderKind::Water, &not_found).await;
        assert!(ctx.cache.peek("u1").is_some());
        assert_eq!(store.endpoint_state("u1"), Some(EndpointState::Active));

        lifecycle.apply("u1", ReminderKind::Water, &not_found).await;
        assert!(ctx.cache.peek("u1").is_none());
        assert_eq!(store.endpoint_state("u1"), Some(EndpointState::Removed));
    }

    #[tokio::test]
    async fn delivery_breaks_a_consecutive_not_found_run() {
        let (lifecycle, ctx, store, _registry) = setup();
        let not_found = DeliveryOutcome::TransientFailure { status: Some(404) };

        lifecycle.apply("u1", ReminderKind::Water, &not_found).await;
        lifecycle.apply("u1", ReminderKind::Water, &not_found).await;
        lifecycle
            .apply("u1", ReminderKind::Water, &DeliveryOutcome::Delivered)
            .await;
        lifecycle.apply("u1", ReminderKind::Water, &not_found).await;
        lifecycle.apply("u1", ReminderKind::Water, &not_found).await;

        // Run never reached the threshold of three.
        assert!(ctx.cache.peek("u1").is_some());
        assert_eq!(store.endpoint_state("u1"), Some(EndpointState::Active));
    }
}
