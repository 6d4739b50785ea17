use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error};

use super::{Tool, ToolContext};

/// Search over the user's uploaded documents, served by the external
/// search backend at `GET {base}/api/search?q=`.
pub struct QueryDatabase {
    client: reqwest::Client,
    base_url: String,
}

impl QueryDatabase {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }

    async fn search(&self, query: &str) -> Result<SearchResponse, String> {
        let url = reqwest::Url::parse_with_params(&format!("{}/api/search", self.base_url), &[("q", query)])
            .map_err(|e| e.to_string())?;
        let response = self.client.get(url).send().await.map_err(|e| e.to_string())?;
        if !response.status().is_success() {
            return Err(format!("search service returned {}", response.status()));
        }
        response.json().await.map_err(|e| e.to_string())
    }
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct QueryInput {
    /// The search query to find documents.
    query: String,
}

/// Body returned by the search backend.
#[derive(Debug, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Vec<Value>,
    #[serde(default)]
    pub time: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct QueryOutput {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    time: Option<f64>,
    results: Vec<Value>,
    message: String,
}

impl QueryOutput {
    fn failed(message: &str) -> Self {
        Self {
            success: false,
            count: None,
            time: None,
            results: Vec::new(),
            message: message.to_owned(),
        }
    }
}

/// Keep the first result for each `filename`. Results without a filename
/// are kept as they are.
pub fn dedup_by_filename(results: Vec<Value>) -> Vec<Value> {
    let mut seen = HashSet::new();
    results
        .into_iter()
        .filter(|r| match r.get("filename").and_then(Value::as_str) {
            Some(name) => seen.insert(name.to_owned()),
            None => true,
        })
        .collect()
}

impl Tool for QueryDatabase {
    type Input = QueryInput;
    type Output = QueryOutput;

    fn name(&self) -> &'static str {
        "queryDatabase"
    }

    fn description(&self) -> &'static str {
        "Search the database for documents matching a query"
    }

    fn execute<'a>(
        &'a self,
        input: QueryInput,
        _ctx: &'a ToolContext,
    ) -> Pin<Box<dyn Future<Output = Result<QueryOutput, String>> + Send + 'a>> {
        Box::pin(async move {
            let query = input.query;
            if query.trim().is_empty() {
                return Ok(QueryOutput::failed("Query cannot be empty"));
            }

            debug!(query = %query, "searching database");
            match self.search(&query).await {
                Ok(response) => {
                    let results = dedup_by_filename(response.results);
                    Ok(QueryOutput {
                        success: true,
                        count: Some(results.len()),
                        time: Some(response.time.unwrap_or(0.0)),
                        message: format!("Found {} document(s) matching \"{query}\"", results.len()),
                        results,
                    })
                }
                Err(e) => {
                    error!(error = %e, "database search failed");
                    Ok(QueryOutput::failed("An error occurred while searching the database"))
                }
            }
        })
    }
}
