use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::Json,
};
use reminder_core::types::{EndpointState, ReminderKind};
use serde::Deserialize;
use tracing;

use crate::server::ApiState;

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "reminder-api"
    }))
}

/// Fire one ad-hoc notification outside the schedule; bypasses the
/// registry and the enabled checks.
pub async fn trigger_test(
    Extension(state): Extension<ApiState>,
    Path(user_id): Path<String>,
) -> Json<serde_json::Value> {
    let result = state.dispatcher.dispatch_test(&user_id).await;
    Json(serde_json::json!({
        "user_id": user_id,
        "result": result.as_str(),
    }))
}

/// Fire one named reminder on demand (the external-cron HTTP path),
/// honoring the same enabled checks as the scheduled path.
pub async fn trigger_named(
    Extension(state): Extension<ApiState>,
    Path((user_id, kind)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let kind: ReminderKind = kind.parse().map_err(|_| StatusCode::BAD_REQUEST)?;
    let result = state.dispatcher.dispatch_named(&user_id, kind).await;
    Ok(Json(serde_json::json!({
        "user_id": user_id,
        "kind": kind.as_str(),
        "result": result.as_str(),
    })))
}

/// Debug query for "why did my reminders stop": endpoint cache state,
/// endpoint lifecycle state, armed trigger kinds, and the last dispatch
/// outcome per kind.
pub async fn user_status(
    Extension(state): Extension<ApiState>,
    Path(user_id): Path<String>,
) -> Json<serde_json::Value> {
    let cached = state.ctx.cache.peek(&user_id);
    let endpoint_state = match &cached {
        Some(endpoint) => Some(endpoint.state),
        None => match state.ctx.store.load_endpoint(&user_id).await {
            Ok(endpoint) => endpoint.map(|e| e.state),
            Err(e) => {
                tracing::warn!("Status query could not reach store for {}: {}", user_id, e);
                None
            }
        },
    };

    let armed: Vec<&str> = state
        .registry
        .kinds_for(&user_id)
        .into_iter()
        .map(|k| k.as_str())
        .collect();

    let last_dispatches: serde_json::Map<String, serde_json::Value> = state
        .ctx
        .status
        .for_user(&user_id)
        .into_iter()
        .map(|(kind, record)| {
            (
                kind.as_str().to_string(),
                serde_json::json!({
                    "result": record.result.as_str(),
                    "at": record.at,
                }),
            )
        })
        .collect();

    Json(serde_json::json!({
        "user_id": user_id,
        "endpoint_cached": cached.is_some(),
        "endpoint_state": endpoint_state.map(|s| match s {
            EndpointState::Active => "active",
            EndpointState::Removed => "removed",
        }),
        "armed": armed,
        "last_dispatches": last_dispatches,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreferenceEvent {
    Subscribed,
    SettingsChanged,
    Unsubscribed,
}

#[derive(Debug, Deserialize)]
pub struct PreferenceEventBody {
    pub user_id: String,
    pub event: PreferenceEvent,
}

/// Change notification from the settings/subscription collaborator; all
/// three events resolve to the same on-demand reconciliation.
pub async fn preference_event(
    Extension(state): Extension<ApiState>,
    Json(body): Json<PreferenceEventBody>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    tracing::info!("Preference event {:?} for user {}", body.event, body.user_id);

    if let Err(e) = state.reconciler.reconcile_user(&body.user_id).await {
        tracing::error!("On-demand reconciliation failed for {}: {}", body.user_id, e);
        return Err(StatusCode::BAD_GATEWAY);
    }

    Ok(Json(serde_json::json!({
        "user_id": body.user_id,
        "armed": state.registry.armed_for(&body.user_id).len(),
    })))
}
