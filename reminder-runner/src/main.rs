use anyhow::Result;
use reminder_api::{run as run_api, ApiState};
use reminder_core::{Config, EngineContext};
use reminder_delivery::{run as run_dispatch, Dispatcher};
use reminder_reconcile::{run_full_loop, run_water_loop, Reconciler};
use reminder_schedule::TriggerRegistry;
use std::sync::Arc;
use tokio;
use tracing;
use tracing_subscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Starting reminder engine");

    // Load configuration
    let config = Config::from_env();
    let ctx = EngineContext::new(config)?;

    let registry = TriggerRegistry::new();
    let reconciler = Arc::new(Reconciler::new(ctx.clone(), registry.clone()));
    let dispatcher = Arc::new(Dispatcher::new(ctx.clone(), registry.clone())?);

    tracing::info!("Engine context initialized");

    // Spawn the scheduling loops as parallel tasks
    let full = reconciler.clone();
    let full_secs = ctx.config.schedule.full_reconcile_secs;
    tokio::spawn(async move {
        if let Err(e) = run_full_loop(full, full_secs).await {
            tracing::error!("Full reconciliation loop error: {}", e);
        }
    });

    let water = reconciler.clone();
    let water_secs = ctx.config.schedule.water_reconcile_secs;
    tokio::spawn(async move {
        if let Err(e) = run_water_loop(water, water_secs).await {
            tracing::error!("Water reconciliation loop error: {}", e);
        }
    });

    let tick_dispatcher = dispatcher.clone();
    let tick_registry = registry.clone();
    tokio::spawn(async move {
        if let Err(e) = run_dispatch(tick_dispatcher, tick_registry).await {
            tracing::error!("Dispatch tick loop error: {}", e);
        }
    });

    // API server runs in main task
    tracing::info!("Starting API server");
    run_api(ApiState {
        ctx,
        registry,
        reconciler,
        dispatcher,
    })
    .await?;

    Ok(())
}
