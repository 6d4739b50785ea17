use std::future::Future;
use std::pin::Pin;

use serde_json::Value;

use super::{Tool, ToolContext};

/// Current weather from an Open-Meteo compatible forecast API.
pub struct GetWeather {
    client: reqwest::Client,
    base_url: String,
}

impl GetWeather {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct WeatherInput {
    /// Latitude in decimal degrees.
    latitude: f64,
    /// Longitude in decimal degrees.
    longitude: f64,
}

impl Tool for GetWeather {
    type Input = WeatherInput;
    type Output = Value;

    fn name(&self) -> &'static str {
        "getWeather"
    }

    fn description(&self) -> &'static str {
        "Get the current weather at a location"
    }

    fn execute<'a>(
        &'a self,
        input: WeatherInput,
        _ctx: &'a ToolContext,
    ) -> Pin<Box<dyn Future<Output = Result<Value, String>> + Send + 'a>> {
        Box::pin(async move {
            let url = reqwest::Url::parse_with_params(
                &format!("{}/v1/forecast", self.base_url),
                &[
                    ("latitude", input.latitude.to_string()),
                    ("longitude", input.longitude.to_string()),
                    ("current", "temperature_2m".to_owned()),
                    ("hourly", "temperature_2m".to_owned()),
                    ("daily", "sunrise,sunset".to_owned()),
                    ("timezone", "auto".to_owned()),
                ],
            )
            .map_err(|e| format!("invalid weather url: {e}"))?;
            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| format!("weather request failed: {e}"))?;
            if !response.status().is_success() {
                return Err(format!("weather service returned {}", response.status()));
            }
            let mut body: Value = response
                .json()
                .await
                .map_err(|e| format!("weather response unreadable: {e}"))?;
            match &mut body {
                Value::Object(map) => {
                    map.insert("success".to_owned(), Value::Bool(true));
                    Ok(body)
                }
                _ => Err("weather response is not an object".to_owned()),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{DataSink, ToolRegistry};
    use httpmock::prelude::*;
    use serde_json::json;

    fn ctx() -> ToolContext {
        ToolContext { user_id: "u1".into(), data: DataSink::disabled() }
    }

    #[tokio::test]
    async fn forwards_forecast_with_success_flag() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/v1/forecast")
                    .query_param("latitude", "52.52")
                    .query_param("longitude", "13.41")
                    .query_param("current", "temperature_2m")
                    .query_param("timezone", "auto");
                then.status(200)
                    .json_body(json!({ "current": { "temperature_2m": 21.5 } }));
            })
            .await;

        let mut registry = ToolRegistry::new();
        registry.register(GetWeather::new(reqwest::Client::new(), &server.base_url()));
        let out = registry
            .execute("getWeather", json!({ "latitude": 52.52, "longitude": 13.41 }), &ctx())
            .await;
        mock.assert_async().await;
        assert_eq!(out["success"], true);
        assert_eq!(out["current"]["temperature_2m"], 21.5);
    }

    #[tokio::test]
    async fn upstream_failure_is_reported_not_raised() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v1/forecast");
                then.status(503);
            })
            .await;

        let mut registry = ToolRegistry::new();
        registry.register(GetWeather::new(reqwest::Client::new(), &server.base_url()));
        let out = registry
            .execute("getWeather", json!({ "latitude": 0.0, "longitude": 0.0 }), &ctx())
            .await;
        assert_eq!(out["success"], false);
    }
}
