use serde_json::json;

use super::{CompletionProvider, chat_messages};
use crate::llm::client::{LlmProvider, LlmRequest};
use crate::llm::config::{Credential, ProviderConfig};
use crate::llm::transport::HttpRequest;

/// Local Ollama daemon; no authentication.
#[derive(Debug, Default, Clone, Copy)]
pub struct OllamaProvider;

impl CompletionProvider for OllamaProvider {
    fn kind(&self) -> LlmProvider {
        LlmProvider::Ollama
    }

    fn build_request(
        &self,
        request: &LlmRequest,
        config: &ProviderConfig,
        _credential: &Credential,
    ) -> HttpRequest {
        let url = format!("{}/api/chat", config.resolved_base_url());

        let mut payload = json!({
            "model": config.model,
            "stream": false,
            "messages": chat_messages(request),
        });

        let mut options = serde_json::Map::new();
        if let Some(max_tokens) = request.max_tokens.or(config.max_tokens) {
            options.insert("num_predict".to_string(), json!(max_tokens));
        }
        if let Some(temperature) = request.temperature {
            options.insert("temperature".to_string(), json!(temperature));
        }
        if !options.is_empty() {
            payload["options"] = serde_json::Value::Object(options);
        }

        HttpRequest::post(url, payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_chat_request() {
        let config = ProviderConfig::new(LlmProvider::Ollama, "llama3").with_max_tokens(256);
        let request = LlmRequest::new("prompt").with_system_prompt(Some("system"));

        let http = OllamaProvider.build_request(&request, &config, &Credential::none(LlmProvider::Ollama));

        assert_eq!(http.url, "http://localhost:11434/api/chat");
        assert!(http.headers.is_empty());
        assert_eq!(http.body["stream"], false);
        assert_eq!(http.body["messages"][0]["role"], "system");
        assert_eq!(http.body["options"]["num_predict"], 256);
    }
}
