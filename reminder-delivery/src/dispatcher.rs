use crate::lifecycle::EndpointLifecycle;
use crate::payload;
use crate::push::PushClient;
use anyhow::Result;
use chrono::{Timelike, Utc};
use reminder_core::types::{DispatchResult, EndpointState, ReminderKind};
use reminder_core::EngineContext;
use reminder_schedule::TriggerRegistry;
use std::sync::Arc;
use std::time::Duration;
use tracing;

/// Fired by a compiled trigger: resolves the user's endpoint, builds the
/// payload, and hands the attempt to the push client. Independent
/// firings never serialize on each other; the tick loop spawns one task
/// per due trigger.
pub struct Dispatcher {
    ctx: EngineContext,
    push: PushClient,
    lifecycle: EndpointLifecycle,
}

impl Dispatcher {
    pub fn new(ctx: EngineContext, registry: TriggerRegistry) -> Result<Self> {
        let push = PushClient::new(&ctx.config.push)?;
        let lifecycle = EndpointLifecycle::new(ctx.clone(), registry);
        Ok(Self {
            ctx,
            push,
            lifecycle,
        })
    }

    /// Scheduled-path dispatch of one reminder. Every result lands in
    /// the status book for the debug query.
    pub async fn dispatch(&self, user_id: &str, kind: ReminderKind) -> DispatchResult {
        let result = self.deliver(user_id, kind).await;
        self.ctx.status.record(user_id, kind, result);
        result
    }

    async fn deliver(&self, user_id: &str, kind: ReminderKind) -> DispatchResult {
        let endpoint = match self.ctx.cache.get(self.ctx.store.as_ref(), user_id).await {
            Ok(Some(endpoint)) => endpoint,
            Ok(None) => {
                // Not an error: the user simply has nowhere to deliver.
                tracing::debug!("No endpoint for user {}, skipping {}", user_id, kind);
                return DispatchResult::NoEndpoint;
            }
            Err(e) => {
                tracing::error!("Failed to resolve endpoint for user {}: {}", user_id, e);
                return DispatchResult::Failure;
            }
        };

        if endpoint.state == EndpointState::Removed {
            return DispatchResult::NoEndpoint;
        }

        let payload = payload::build(kind, &mut rand::thread_rng());
        let outcome = self.push.send(&endpoint, &payload).await;
        self.lifecycle.apply(user_id, kind, &outcome).await
    }

    /// Ad-hoc notification outside any schedule; bypasses the registry
    /// and the enabled checks.
    pub async fn dispatch_test(&self, user_id: &str) -> DispatchResult {
        let endpoint = match self.ctx.cache.get(self.ctx.store.as_ref(), user_id).await {
            Ok(Some(endpoint)) => endpoint,
            Ok(None) => return DispatchResult::NoEndpoint,
            Err(e) => {
                tracing::error!("Failed to resolve endpoint for user {}: {}", user_id, e);
                return DispatchResult::Failure;
            }
        };

        if endpoint.state == EndpointState::Removed {
            return DispatchResult::NoEndpoint;
        }

        match self.push.send(&endpoint, &payload::build_test()).await {
            reminder_core::types::DeliveryOutcome::Delivered => DispatchResult::Delivered,
            _ => DispatchResult::Failure,
        }
    }

    /// One named reminder on demand (the external-cron HTTP path),
    /// honoring the same enabled checks as the scheduled path.
    pub async fn dispatch_named(&self, user_id: &str, kind: ReminderKind) -> DispatchResult {
        let profile = match self.ctx.store.load_profile(user_id).await {
            Ok(Some(profile)) => profile,
            Ok(None) => {
                self.ctx.status.record(user_id, kind, DispatchResult::Disabled);
                return DispatchResult::Disabled;
            }
            Err(e) => {
                tracing::error!("Failed to load profile for user {}: {}", user_id, e);
                return DispatchResult::Failure;
            }
        };

        if !profile.kind_enabled(kind) {
            self.ctx.status.record(user_id, kind, DispatchResult::Disabled);
            return DispatchResult::Disabled;
        }

        self.dispatch(user_id, kind).await
    }
}

/// Minute-tick loop: wakes on every UTC minute boundary, collects the
/// due triggers, and spawns one dispatch task per trigger so a slow
/// delivery never blocks the scheduler's own timing.
pub async fn run(dispatcher: Arc<Dispatcher>, registry: TriggerRegistry) -> Result<()> {
    tracing::info!("Starting dispatch tick loop");

    let mut last_tick: Option<(u8, u8)> = None;
    loop {
        sleep_to_next_minute().await;

        let now = Utc::now();
        let tick = (now.hour() as u8, now.minute() as u8);
        if last_tick == Some(tick) {
            continue;
        }
        last_tick = Some(tick);

        let due = registry.due(tick.0, tick.1);
        if due.is_empty() {
            continue;
        }
        tracing::debug!("{} triggers due at {:02}:{:02} UTC", due.len(), tick.0, tick.1);

        for trigger in due {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move {
                dispatcher.dispatch(&trigger.user_id, trigger.kind).await;
            });
        }
    }
}

async fn sleep_to_next_minute() {
    let now = Utc::now();
    let into_minute =
        u64::from(now.second()) * 1000 + u64::from(now.timestamp_subsec_millis());
    // Small margin past the boundary; the tick guard above drops any
    // duplicate wake-up within the same minute.
    let wait = 60_000u64.saturating_sub(into_minute) + 5;
    tokio::time::sleep(Duration::from_millis(wait)).await;
}
