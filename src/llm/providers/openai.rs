use serde_json::json;

use super::{CompletionProvider, apply_chat_options, chat_messages};
use crate::llm::client::{LlmProvider, LlmRequest};
use crate::llm::config::{Credential, ProviderConfig};
use crate::llm::transport::HttpRequest;

#[derive(Debug, Default, Clone, Copy)]
pub struct OpenAiProvider;

impl CompletionProvider for OpenAiProvider {
    fn kind(&self) -> LlmProvider {
        LlmProvider::OpenAi
    }

    fn build_request(
        &self,
        request: &LlmRequest,
        config: &ProviderConfig,
        credential: &Credential,
    ) -> HttpRequest {
        let url = format!("{}/chat/completions", config.resolved_base_url());

        let mut payload = json!({
            "model": config.model,
            "messages": chat_messages(request),
        });
        apply_chat_options(&mut payload, request, config);

        HttpRequest::post(url, payload)
            .header("Authorization", format!("Bearer {}", credential.expose()))
    }
}
