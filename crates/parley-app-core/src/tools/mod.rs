//! Tools the model may call during a turn.
//!
//! Tool authors implement [`Tool`] with typed input and output; the
//! [`ToolRegistry`] erases the types, advertises JSON schemas to the model
//! and turns every failure into a `{success: false, message}` result so a
//! tool can never break the response stream.

mod document;
mod query_database;
mod suggestions;
mod weather;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use schemars::JsonSchema;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::entities::DocumentStore;
use crate::llm::{ModelRegistry, ToolDef};
use crate::stream::StreamPart;

pub use document::{CreateDocument, DocumentOutput, UpdateDocument};
pub use query_database::{QueryDatabase, SearchResponse, dedup_by_filename};
pub use suggestions::RequestSuggestions;
pub use weather::GetWeather;

pub const DEFAULT_SEARCH_API_URL: &str = "http://localhost:8000/api";
pub const DEFAULT_WEATHER_API_URL: &str = "https://api.open-meteo.com";

/// Endpoints of the HTTP-backed tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolSettings {
    pub search_api_url: String,
    pub weather_api_url: String,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            search_api_url: DEFAULT_SEARCH_API_URL.to_owned(),
            weather_api_url: DEFAULT_WEATHER_API_URL.to_owned(),
        }
    }
}

/// Side channel from tools to the client stream.
#[derive(Debug, Clone, Default)]
pub struct DataSink {
    tx: Option<mpsc::Sender<StreamPart>>,
}

impl DataSink {
    pub fn new(tx: mpsc::Sender<StreamPart>) -> Self {
        Self { tx: Some(tx) }
    }

    /// A sink that drops everything.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Send one data item. A departed client is not an error; the tool runs
    /// to completion regardless.
    pub async fn write(&self, item: Value) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(StreamPart::Data(vec![item])).await;
        }
    }
}

/// Per-call context handed to every tool.
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// The caller on whose behalf the tool runs.
    pub user_id: String,
    pub data: DataSink,
}

/// A typed tool.
pub trait Tool: Send + Sync + 'static {
    type Input: DeserializeOwned + JsonSchema + Send;
    type Output: Serialize + Send;

    fn name(&self) -> &'static str;

    /// Shown to the model when it chooses a tool.
    fn description(&self) -> &'static str;

    fn execute<'a>(
        &'a self,
        input: Self::Input,
        ctx: &'a ToolContext,
    ) -> Pin<Box<dyn Future<Output = Result<Self::Output, String>> + Send + 'a>>;
}

trait DynTool: Send + Sync {
    fn name(&self) -> &'static str;

    fn def(&self) -> ToolDef;

    fn execute_dyn<'a>(
        &'a self,
        input: Value,
        ctx: &'a ToolContext,
    ) -> Pin<Box<dyn Future<Output = Result<Value, String>> + Send + 'a>>;
}

impl<T: Tool> DynTool for T {
    fn name(&self) -> &'static str {
        Tool::name(self)
    }

    fn def(&self) -> ToolDef {
        let mut parameters =
            serde_json::to_value(schemars::schema_for!(T::Input)).unwrap_or_else(|_| json!({ "type": "object" }));
        if let Value::Object(map) = &mut parameters {
            map.remove("$schema");
            map.remove("title");
        }
        ToolDef {
            name: Tool::name(self).to_owned(),
            description: self.description().to_owned(),
            parameters,
        }
    }

    fn execute_dyn<'a>(
        &'a self,
        input: Value,
        ctx: &'a ToolContext,
    ) -> Pin<Box<dyn Future<Output = Result<Value, String>> + Send + 'a>> {
        match serde_json::from_value::<T::Input>(input) {
            Ok(typed) => Box::pin(async move {
                let output = self.execute(typed, ctx).await?;
                serde_json::to_value(output).map_err(|e| e.to_string())
            }),
            Err(e) => {
                let msg = format!("invalid input: {e}");
                Box::pin(async move { Err(msg) })
            }
        }
    }
}

/// Type-erased set of tools.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Box<dyn DynTool>>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The five built-in tools.
    pub fn builtin<S>(client: reqwest::Client, models: Arc<ModelRegistry>, store: S, settings: &ToolSettings) -> Self
    where
        S: DocumentStore + Clone,
    {
        let mut tools = Self::new();
        tools.register(GetWeather::new(client.clone(), &settings.weather_api_url));
        tools.register(CreateDocument::new(models.clone(), store.clone()));
        tools.register(UpdateDocument::new(models.clone(), store.clone()));
        tools.register(RequestSuggestions::new(models, store));
        tools.register(QueryDatabase::new(client, &settings.search_api_url));
        tools
    }

    pub fn register(&mut self, tool: impl Tool) {
        self.tools.push(Box::new(tool));
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn defs(&self) -> Vec<ToolDef> {
        self.tools.iter().map(|t| t.def()).collect()
    }

    /// Run the tool `name`. Never fails: errors become
    /// `{success: false, message}`.
    pub async fn execute(&self, name: &str, input: Value, ctx: &ToolContext) -> Value {
        let Some(tool) = self.tools.iter().find(|t| t.name() == name) else {
            warn!(tool = name, "model called an unknown tool");
            return failure(format!("tool not found: {name}"));
        };
        match tool.execute_dyn(input, ctx).await {
            Ok(value) => {
                debug!(tool = name, "tool finished");
                value
            }
            Err(message) => {
                warn!(tool = name, error = %message, "tool failed");
                failure(message)
            }
        }
    }
}

fn failure(message: String) -> Value {
    json!({ "success": false, "message": message })
}
