//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use parley_app_core::{ChatService, SqliteStore};

use crate::auth::AuthProvider;
use crate::config::Config;

#[derive(Clone, Debug)]
pub struct AppState {
    /// Server configuration (env-derived).
    pub config: Arc<Config>,
    /// Turn orchestration and the chat resources around it.
    pub chat: ChatService<SqliteStore>,
    pub auth: Arc<dyn AuthProvider>,
}
