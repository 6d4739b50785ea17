use parley_types::ChatModel;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A selectable chat model.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ModelResponse {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Reasoning models run without tools.
    pub reasoning: bool,
    pub tools: bool,
}

impl From<&ChatModel> for ModelResponse {
    fn from(model: &ChatModel) -> Self {
        Self {
            id: model.id.to_owned(),
            name: model.name.to_owned(),
            description: model.description.to_owned(),
            reasoning: model.is_reasoning(),
            tools: !model.is_reasoning(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ModelsResponse {
    pub default_model: String,
    pub models: Vec<ModelResponse>,
}
