//! Router harness for handler tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, header};
use http_body_util::BodyExt;
use parley_app_core::llm::ModelRegistry;
use parley_app_core::testing::ScriptedModel;
use parley_app_core::tools::ToolRegistry;
use parley_app_core::{ChatService, SqliteStore};
use parley_types::models::{DEFAULT_ALTERNATIVE_MODEL, DEFAULT_CHAT_MODEL, TITLE_MODEL};
use serde_json::Value;
use tower::ServiceExt;

use crate::auth::StaticTokenAuth;
use crate::config::Config;
use crate::state::AppState;

pub const ALICE: &str = "alice-token";
pub const BOB: &str = "bob-token";

pub struct TestApp {
    router: Router,
    state: Arc<AppState>,
}

impl TestApp {
    pub async fn new(chat_model: ScriptedModel) -> Self {
        Self::with_alternatives(chat_model, ScriptedModel::new()).await
    }

    pub async fn with_alternatives(chat_model: ScriptedModel, alt_model: ScriptedModel) -> Self {
        let store = SqliteStore::in_memory().await.unwrap();
        let mut models = ModelRegistry::new();
        models.register(DEFAULT_CHAT_MODEL, Arc::new(chat_model));
        models.register(DEFAULT_ALTERNATIVE_MODEL, Arc::new(alt_model));
        models.register(TITLE_MODEL, Arc::new(ScriptedModel::new().with_reply("Test chat")));

        let config = Config {
            stream_delay: Duration::ZERO,
            api_tokens: HashMap::from([
                (ALICE.to_owned(), "alice".to_owned()),
                (BOB.to_owned(), "bob".to_owned()),
            ]),
            ..Config::default()
        };
        let chat = ChatService::new(store, Arc::new(models), Arc::new(ToolRegistry::new()), config.chat());
        let state = Arc::new(AppState {
            auth: Arc::new(StaticTokenAuth::new(config.api_tokens.clone())),
            config: Arc::new(config),
            chat,
        });
        Self {
            router: crate::routes::build(state.clone()),
            state,
        }
    }

    pub fn chat(&self) -> &ChatService<SqliteStore> {
        &self.state.chat
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }
}

fn request(method: &str, uri: &str, token: Option<&str>) -> axum::http::request::Builder {
    let builder = Request::builder().method(method).uri(uri);
    match token {
        Some(token) => builder.header(header::AUTHORIZATION, format!("Bearer {token}")),
        None => builder,
    }
}

pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    request("GET", uri, token).body(Body::empty()).unwrap()
}

pub fn delete(uri: &str, token: Option<&str>) -> Request<Body> {
    request("DELETE", uri, token).body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, token: Option<&str>, body: &Value) -> Request<Body> {
    json_request("POST", uri, token, body)
}

pub fn patch_json(uri: &str, token: Option<&str>, body: &Value) -> Request<Body> {
    json_request("PATCH", uri, token, body)
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: &Value) -> Request<Body> {
    request(method, uri, token)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}
