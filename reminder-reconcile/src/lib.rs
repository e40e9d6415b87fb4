use anyhow::Result;
use reminder_core::types::{EndpointState, ReminderKind};
use reminder_core::EngineContext;
use reminder_schedule::{compile, TriggerRegistry};
use std::sync::Arc;
use std::time::Duration;
use tracing;

/// Keeps the registry's live trigger set equal to the union of the
/// compiler's output over the current profile snapshot.
///
/// Three idempotent paths share one pass mutex so no two reconciliations
/// interleave: the hourly full tear-down/rebuild, the half-hourly
/// water-only rebuild, and the on-demand per-user path driven by
/// preference-change events. None of them touch dispatches already in
/// flight.
pub struct Reconciler {
    ctx: EngineContext,
    registry: TriggerRegistry,
    pass_guard: tokio::sync::Mutex<()>,
}

impl Reconciler {
    pub fn new(ctx: EngineContext, registry: TriggerRegistry) -> Self {
        Self {
            ctx,
            registry,
            pass_guard: tokio::sync::Mutex::new(()),
        }
    }

    /// Full reconciliation: reload the snapshot, recompile everything,
    /// swap the armed set in one go. On a snapshot load failure the
    /// previous trigger set stays armed; a store outage degrades to a
    /// stale schedule, never to no reminders at all.
    pub async fn reconcile_full(&self) -> Result<()> {
        let _pass = self.pass_guard.lock().await;

        let snapshots = self.ctx.store.load_enabled_profiles().await?;
        let fallback = &self.ctx.config.schedule.default_timezone;

        let mut triggers = Vec::new();
        for snapshot in &snapshots {
            match &snapshot.endpoint {
                Some(endpoint) if endpoint.state == EndpointState::Active => {
                    self.ctx.cache.insert(endpoint.clone());
                }
                _ => self.ctx.cache.purge(&snapshot.profile.user_id),
            }
            triggers.extend(compile(&snapshot.profile, fallback));
        }

        let user_count = snapshots.len();
        self.registry.swap_all(triggers);
        tracing::info!(
            "Full reconciliation: {} triggers armed across {} users",
            self.registry.armed_count(),
            user_count
        );
        Ok(())
    }

    /// Water-only reconciliation, so mid-hour hydration settings changes
    /// take effect faster than the full hourly pass.
    pub async fn reconcile_water(&self) -> Result<()> {
        let _pass = self.pass_guard.lock().await;

        let snapshots = self.ctx.store.load_enabled_profiles().await?;
        let fallback = &self.ctx.config.schedule.default_timezone;

        let water: Vec<_> = snapshots
            .iter()
            .flat_map(|s| compile(&s.profile, fallback))
            .filter(|t| t.kind == ReminderKind::Water)
            .collect();

        let count = water.len();
        self.registry.swap_kind(ReminderKind::Water, water);
        tracing::debug!("Water reconciliation: {} water triggers armed", count);
        Ok(())
    }

    /// On-demand reconciliation for one user, invoked on subscribe,
    /// settings change, or unsubscribe. Rebuilds their triggers and
    /// refreshes their slot in the endpoint cache.
    pub async fn reconcile_user(&self, user_id: &str) -> Result<()> {
        let _pass = self.pass_guard.lock().await;

        self.ctx.cache.purge(user_id);
        match self.ctx.store.load_endpoint(user_id).await {
            Ok(Some(endpoint)) if endpoint.state == EndpointState::Active => {
                self.ctx.cache.insert(endpoint);
            }
            Ok(_) => {}
            Err(e) => {
                // Cache stays empty; the dispatcher's read-through will
                // retry against the store on the next firing.
                tracing::warn!("Failed to refresh endpoint for user {}: {}", user_id, e);
            }
        }

        let triggers = match self.ctx.store.load_profile(user_id).await? {
            Some(profile) => compile(&profile, &self.ctx.config.schedule.default_timezone),
            None => Vec::new(),
        };

        let count = triggers.len();
        self.registry.replace_user(user_id, triggers);
        tracing::info!("Reconciled user {}: {} triggers armed", user_id, count);
        Ok(())
    }
}

/// Hourly tear-down/rebuild pass, run immediately at startup to arm the
/// initial trigger set.
pub async fn run_full_loop(reconciler: Arc<Reconciler>, interval_secs: u64) -> Result<()> {
    tracing::info!("Starting full reconciliation loop ({}s)", interval_secs);

    loop {
        if let Err(e) = reconciler.reconcile_full().await {
            tracing::error!(
                "Full reconciliation failed, keeping previous trigger set: {}",
                e
            );
        }
        tokio::time::sleep(Duration::from_secs(interval_secs)).await;
    }
}

pub async fn run_water_loop(reconciler: Arc<Reconciler>, interval_secs: u64) -> Result<()> {
    tracing::info!("Starting water reconciliation loop ({}s)", interval_secs);

    loop {
        tokio::time::sleep(Duration::from_secs(interval_secs)).await;
        if let Err(e) = reconciler.reconcile_water().await {
            tracing::error!(
                "Water reconciliation failed, keeping previous water triggers: {}",
                e
            );
        }
    }
}
