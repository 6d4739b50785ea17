use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use parley_types::models::{ARTIFACT_MODEL, CHAT_MODELS, Reasoning, TITLE_MODEL, find_model};
use tracing::info;

use super::openai_compat::OpenAiCompatible;
use super::reasoning::TaggedReasoning;
use super::{LanguageModel, LlmError};

/// Connection settings for one OpenAI-compatible provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSettings {
    pub name: String,
    pub base_url: String,
    pub api_key: Option<String>,
}

/// Upstream model bound to each catalog id: `(id, provider, upstream model)`.
const DEFAULT_BINDINGS: &[(&str, Provider, &str)] = &[
    ("chat-model", Provider::OpenAi, "gpt-4o"),
    ("chat-model-reasoning", Provider::Groq, "deepseek-r1-distill-llama-70b"),
    ("chat-model-4o", Provider::OpenAi, "gpt-4o"),
    ("chat-model-4o-mini", Provider::OpenAi, "gpt-4o-mini"),
    ("reasoning-model-o3-mini", Provider::OpenAi, "o3-mini"),
    ("reasoning-model-o1-mini", Provider::OpenAi, "o1-mini"),
    (TITLE_MODEL, Provider::OpenAi, "gpt-4o"),
    (ARTIFACT_MODEL, Provider::OpenAi, "gpt-4o"),
];

#[derive(Clone, Copy)]
enum Provider {
    OpenAi,
    Groq,
}

/// Maps model ids to configured models.
#[derive(Default)]
pub struct ModelRegistry {
    models: HashMap<String, Arc<dyn LanguageModel>>,
    tools_disabled: HashSet<String>,
}

impl fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<&String> = self.models.keys().collect();
        ids.sort();
        f.debug_struct("ModelRegistry")
            .field("models", &ids)
            .field("tools_disabled", &self.tools_disabled)
            .finish()
    }
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Default bindings of the catalog to OpenAI and Groq.
    pub fn from_providers(
        client: reqwest::Client,
        openai: &ProviderSettings,
        groq: &ProviderSettings,
    ) -> Self {
        let mut registry = Self::new();
        for (id, provider, upstream) in DEFAULT_BINDINGS {
            let settings = match provider {
                Provider::OpenAi => openai,
                Provider::Groq => groq,
            };
            let base: Arc<dyn LanguageModel> =
                Arc::new(OpenAiCompatible::new(client.clone(), settings, *upstream));
            let catalog = CHAT_MODELS.iter().find(|m| m.id == *id);
            match catalog.and_then(|m| m.reasoning) {
                Some(Reasoning::Tagged(tag)) => registry.register_reasoning(*id, base, Some(tag)),
                Some(Reasoning::Native) => registry.register_reasoning(*id, base, None),
                None => registry.register(*id, base),
            }
        }
        info!(
            models = registry.models.len(),
            openai = %openai.base_url,
            groq = %groq.base_url,
            "model registry initialised"
        );
        registry
    }

    pub fn register(&mut self, id: impl Into<String>, model: Arc<dyn LanguageModel>) {
        self.models.insert(id.into(), model);
    }

    /// Register a reasoning model. Tools are disabled for it; with a `tag`,
    /// inline reasoning is split out of its text.
    pub fn register_reasoning(
        &mut self,
        id: impl Into<String>,
        model: Arc<dyn LanguageModel>,
        tag: Option<&str>,
    ) {
        let id = id.into();
        let model = match tag {
            Some(tag) => Arc::new(TaggedReasoning::new(model, tag)) as Arc<dyn LanguageModel>,
            None => model,
        };
        self.tools_disabled.insert(id.clone());
        self.models.insert(id, model);
    }

    pub fn get(&self, id: &str) -> Result<Arc<dyn LanguageModel>, LlmError> {
        self.models
            .get(id)
            .cloned()
            .ok_or_else(|| LlmError::UnknownModel(id.to_owned()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.models.contains_key(id)
    }

    /// Whether clients may pick `id` for a turn: a catalog model the
    /// registry can serve. Internal models such as the title model are not.
    pub fn is_selectable(&self, id: &str) -> bool {
        find_model(id).is_some() && self.contains(id)
    }

    pub fn supports_tools(&self, id: &str) -> bool {
        self.contains(id) && !self.tools_disabled.contains(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(name: &str) -> ProviderSettings {
        ProviderSettings {
            name: name.into(),
            base_url: format!("http://{name}.invalid/v1"),
            api_key: None,
        }
    }

    #[test]
    fn default_bindings_cover_catalog_and_internal_models() {
        let registry = ModelRegistry::from_providers(reqwest::Client::new(), &provider("openai"), &provider("groq"));
        for model in CHAT_MODELS {
            assert!(registry.contains(model.id), "{} missing", model.id);
        }
        assert_eq!(registry.get(TITLE_MODEL).unwrap().model_id(), "gpt-4o");
        assert_eq!(
            registry.get("chat-model-reasoning").unwrap().model_id(),
            "deepseek-r1-distill-llama-70b"
        );
    }

    #[test]
    fn reasoning_models_have_no_tools() {
        let registry = ModelRegistry::from_providers(reqwest::Client::new(), &provider("openai"), &provider("groq"));
        assert!(registry.supports_tools("chat-model"));
        assert!(!registry.supports_tools("chat-model-reasoning"));
        assert!(!registry.supports_tools("reasoning-model-o3-mini"));
        assert!(!registry.supports_tools("reasoning-model-o1-mini"));
        assert!(!registry.supports_tools("missing"));
    }

    #[test]
    fn internal_models_are_not_selectable() {
        let registry = ModelRegistry::from_providers(reqwest::Client::new(), &provider("openai"), &provider("groq"));
        assert!(registry.is_selectable("chat-model"));
        assert!(registry.contains(TITLE_MODEL));
        assert!(!registry.is_selectable(TITLE_MODEL));
        assert!(!registry.is_selectable(ARTIFACT_MODEL));
        assert!(!ModelRegistry::new().is_selectable("chat-model"));
    }

    #[test]
    fn unknown_model_is_an_error() {
        let err = ModelRegistry::new().get("nope").err().unwrap();
        assert!(matches!(err, LlmError::UnknownModel(id) if id == "nope"));
    }
}
