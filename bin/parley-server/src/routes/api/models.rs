//! The public model catalog.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use parley_types::models::{CHAT_MODELS, DEFAULT_CHAT_MODEL};
use utoipa::OpenApi;

use crate::schemas::api::models::{ModelResponse, ModelsResponse};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(list_models), components(schemas(ModelResponse, ModelsResponse)))]
pub struct ModelsApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/models", get(list_models))
}

/// Selectable chat models. Only models the server can serve are listed.
#[utoipa::path(
    get,
    path = "/api/models",
    tag = "models",
    responses((status = 200, description = "Model catalog", body = ModelsResponse))
)]
pub async fn list_models(State(state): State<Arc<AppState>>) -> Json<ModelsResponse> {
    let models = CHAT_MODELS
        .iter()
        .filter(|m| state.chat.models().is_selectable(m.id))
        .map(ModelResponse::from)
        .collect();
    Json(ModelsResponse {
        default_model: DEFAULT_CHAT_MODEL.to_owned(),
        models,
    })
}
