//! Server configuration, loaded from environment variables at startup.

use std::collections::HashMap;
use std::time::Duration;

use parley_app_core::ChatConfig;
use parley_app_core::llm::ProviderSettings;
use parley_app_core::tools::ToolSettings;
use parley_types::models::DEFAULT_ALTERNATIVE_MODEL;

/// Runtime configuration for parley-server.
///
/// Every field has a default so the server starts without any environment
/// variables set. Model calls fail until provider keys are configured.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:3000"`).
    pub bind_address: String,

    /// sqlx SQLite URL (default: `"sqlite://parley.db?mode=rwc"`).
    pub database_url: String,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    /// Comma-separated allowed origins; `None` allows any origin.
    pub cors_allowed_origins: Option<String>,

    pub enable_swagger: bool,

    /// Bearer token to user id.
    pub api_tokens: HashMap<String, String>,

    pub max_duration: Duration,
    pub max_steps: usize,
    pub stream_delay: Duration,
    pub alternative_model: String,

    pub search_api_url: String,
    pub weather_api_url: String,

    pub openai: ProviderSettings,
    pub groq: ProviderSettings,
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let tools = ToolSettings::default();
        Self {
            bind_address: env_or("PARLEY_BIND", "0.0.0.0:3000"),
            database_url: env_or("PARLEY_DATABASE_URL", "sqlite://parley.db?mode=rwc"),
            log_level: env_or("PARLEY_LOG", "info"),
            log_json: std::env::var("PARLEY_LOG_JSON")
                .map(|v| parse_flag(&v))
                .unwrap_or(false),
            cors_allowed_origins: std::env::var("PARLEY_CORS_ORIGINS").ok().filter(|v| !v.trim().is_empty()),
            enable_swagger: std::env::var("PARLEY_ENABLE_SWAGGER")
                .map(|v| parse_flag(&v))
                .unwrap_or(true),
            api_tokens: parse_tokens(&env_or("PARLEY_API_TOKENS", "")),
            max_duration: Duration::from_secs(parse_env("PARLEY_MAX_DURATION_SECS", 60)),
            max_steps: parse_env("PARLEY_MAX_STEPS", 5),
            stream_delay: Duration::from_millis(parse_env("PARLEY_STREAM_DELAY_MS", 10)),
            alternative_model: env_or("PARLEY_ALTERNATIVE_MODEL", DEFAULT_ALTERNATIVE_MODEL),
            search_api_url: env_or("PARLEY_SEARCH_API_URL", &tools.search_api_url),
            weather_api_url: env_or("PARLEY_WEATHER_API_URL", &tools.weather_api_url),
            openai: provider("openai", "OPENAI", "https://api.openai.com/v1"),
            groq: provider("groq", "GROQ", "https://api.groq.com/openai/v1"),
        }
    }

    pub fn chat(&self) -> ChatConfig {
        ChatConfig {
            max_steps: self.max_steps,
            max_duration: self.max_duration,
            stream_delay: self.stream_delay,
            alternative_model: self.alternative_model.clone(),
        }
    }

    pub fn tools(&self) -> ToolSettings {
        ToolSettings {
            search_api_url: self.search_api_url.clone(),
            weather_api_url: self.weather_api_url.clone(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let chat = ChatConfig::default();
        let tools = ToolSettings::default();
        Self {
            bind_address: "127.0.0.1:0".to_owned(),
            database_url: "sqlite::memory:".to_owned(),
            log_level: "info".to_owned(),
            log_json: false,
            cors_allowed_origins: None,
            enable_swagger: false,
            api_tokens: HashMap::new(),
            max_duration: chat.max_duration,
            max_steps: chat.max_steps,
            stream_delay: chat.stream_delay,
            alternative_model: chat.alternative_model,
            search_api_url: tools.search_api_url,
            weather_api_url: tools.weather_api_url,
            openai: ProviderSettings {
                name: "openai".to_owned(),
                base_url: "https://api.openai.com/v1".to_owned(),
                api_key: None,
            },
            groq: ProviderSettings {
                name: "groq".to_owned(),
                base_url: "https://api.groq.com/openai/v1".to_owned(),
                api_key: None,
            },
        }
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_flag(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

fn provider(name: &str, prefix: &str, default_base: &str) -> ProviderSettings {
    ProviderSettings {
        name: name.to_owned(),
        base_url: env_or(&format!("{prefix}_BASE_URL"), default_base),
        api_key: std::env::var(format!("{prefix}_API_KEY")).ok().filter(|k| !k.is_empty()),
    }
}

/// `token=user,token=user`. Malformed entries are skipped.
fn parse_tokens(raw: &str) -> HashMap<String, String> {
    raw.split(',')
        .filter_map(|entry| {
            let (token, user) = entry.trim().split_once('=')?;
            let (token, user) = (token.trim(), user.trim());
            (!token.is_empty() && !user.is_empty()).then(|| (token.to_owned(), user.to_owned()))
        })
        .collect()
}
