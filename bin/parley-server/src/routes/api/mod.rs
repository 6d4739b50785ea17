//! Routes nested under `/api`.

mod chat;
mod document;
mod history;
mod models;
mod vote;

use std::sync::Arc;

use axum::Router;
use utoipa::OpenApi;

use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .merge(chat::router())
        .merge(history::router())
        .merge(vote::router())
        .merge(document::router())
        .merge(models::router())
}

pub fn api_docs() -> utoipa::openapi::OpenApi {
    let mut docs = chat::ChatApi::openapi();
    docs.merge(history::HistoryApi::openapi());
    docs.merge(vote::VoteApi::openapi());
    docs.merge(document::DocumentApi::openapi());
    docs.merge(models::ModelsApi::openapi());
    docs
}

#[cfg(test)]
pub(crate) mod test_support;
