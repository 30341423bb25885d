use serde_json::json;

use super::{CompletionProvider, apply_chat_options, chat_messages};
use crate::llm::client::{LlmProvider, LlmRequest};
use crate::llm::config::{Credential, ProviderConfig};
use crate::llm::transport::HttpRequest;

#[derive(Debug, Default, Clone, Copy)]
pub struct MistralProvider;

impl CompletionProvider for MistralProvider {
    fn kind(&self) -> LlmProvider {
        LlmProvider::Mistral
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
            "stream": false,
        });
        apply_chat_options(&mut payload, request, config);

        HttpRequest::post(url, payload)
            .header("Authorization", format!("Bearer {}", credential.expose()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request() {
        let config = ProviderConfig::new(LlmProvider::Mistral, "mistral-small-latest");
        let credential = Credential::new(LlmProvider::Mistral, "m-key");
        let mut request = LlmRequest::new("prompt");
        request.temperature = Some(0.2);

        let http = MistralProvider.build_request(&request, &config, &credential);

        assert_eq!(http.url, "https://api.mistral.ai/v1/chat/completions");
        assert_eq!(http.header_value("Authorization"), Some("Bearer m-key"));
        assert_eq!(http.body["stream"], false);
        assert_eq!(http.body["messages"][0]["role"], "user");
        assert!(http.body["temperature"].as_f64().is_some());
    }
}
