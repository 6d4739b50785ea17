use utoipa::OpenApi;

use crate::routes::{api, health};

#[derive(OpenApi)]
#[openapi(info(
    title = "parley-server",
    description = "Streaming chat turns with alternatives, evaluators and tools",
    version = "0.1.0"
))]
pub struct ApiDoc;

pub fn get_docs() -> utoipa::openapi::OpenApi {
    let mut root = ApiDoc::openapi();
    root.merge(health::HealthApi::openapi());
    root.merge(api::api_docs());
    root
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn docs_list_the_chat_routes() {
        let docs = get_docs();
        for path in ["/health", "/api/chat", "/api/history", "/api/vote", "/api/models"] {
            assert!(docs.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
