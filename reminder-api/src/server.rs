use anyhow::Result;
use axum::{
    extract::Extension,
    routing::{get, post},
    Router,
};
use reminder_core::EngineContext;
use reminder_delivery::Dispatcher;
use reminder_reconcile::Reconciler;
use reminder_schedule::TriggerRegistry;
use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tracing;

use crate::handlers;

#[derive(Clone)]
pub struct ApiState {
    pub ctx: EngineContext,
    pub registry: TriggerRegistry,
    pub reconciler: Arc<Reconciler>,
    pub dispatcher: Arc<Dispatcher>,
}

pub async fn run(state: ApiState) -> Result<()> {
    let api_port = state.ctx.config.server.api_port;

    // Configure CORS - allow specific origins or all if CORS_ORIGINS not set
    let cors_layer = if let Ok(origins) = env::var("CORS_ORIGINS") {
        let origin_list: Vec<&str> = origins.split(',').map(|s| s.trim()).collect();
        let mut cors = CorsLayer::new();
        for origin in origin_list {
            if let Ok(parsed) = origin.parse::<axum::http::HeaderValue>() {
                cors = cors.allow_origin(parsed);
            }
        }
        cors.allow_methods(Any).allow_headers(Any)
    } else {
        tracing::warn!("CORS_ORIGINS not set, using permissive CORS. Set CORS_ORIGINS for production!");
        CorsLayer::permissive()
    };

    let app = Router::new()
        .route("/health", get(handlers::health))
        .route("/api/v1/test/:user_id", post(handlers::trigger_test))
        .route(
            "/api/v1/reminders/:user_id/:kind",
            post(handlers::trigger_named),
        )
        .route("/api/v1/status/:user_id", get(handlers::user_status))
        .route("/api/v1/events", post(handlers::preference_event))
        .layer(ServiceBuilder::new().layer(Extension(state)).layer(cors_layer));

    let addr = SocketAddr::from(([0, 0, 0, 0], api_port));
    tracing::info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
