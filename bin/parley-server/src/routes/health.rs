//! Liveness of the server and of its model bindings.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use parley_types::models::CHAT_MODELS;
use serde_json::{Value, json};
use utoipa::OpenApi;

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(get_health))]
pub struct HealthApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(get_health))
}

/// Heartbeat endpoint.
///
/// Returns `{"status", "version", "chatModels"}` with HTTP 200. `status` is
/// `"degraded"` when no catalog model can serve a turn.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Server is up", body = Value)
    )
)]
pub async fn get_health(State(state): State<Arc<AppState>>) -> Json<Value> {
    let chat_models = CHAT_MODELS
        .iter()
        .filter(|m| state.chat.models().is_selectable(m.id))
        .count();
    Json(json!({
        "status": if chat_models == 0 { "degraded" } else { "ok" },
        "version": env!("CARGO_PKG_VERSION"),
        "chatModels": chat_models,
    }))
}
