use serde_json::json;

use super::CompletionProvider;
use crate::llm::client::{LlmProvider, LlmRequest};
use crate::llm::config::{Credential, ProviderConfig};
use crate::llm::transport::HttpRequest;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 4096;

#[derive(Debug, Default, Clone, Copy)]
pub struct AnthropicProvider;

impl CompletionProvider for AnthropicProvider {
    fn kind(&self) -> LlmProvider {
        LlmProvider::Anthropic
    }

    fn build_request(
        &self,
        request: &LlmRequest,
        config: &ProviderConfig,
        credential: &Credential,
    ) -> HttpRequest {
        let url = format!("{}/messages", config.resolved_base_url());

        // The Messages API takes the system prompt as a top-level field.
        let mut payload = json!({
            "model": config.model,
            "max_tokens": request.max_tokens.or(config.max_tokens).unwrap_or(DEFAULT_MAX_TOKENS),
            "messages": [{ "role": "user", "content": request.prompt }],
        });

        if let Some(system) = &request.system_prompt {
            payload["system"] = json!(system);
        }
        if let Some(temperature) = request.temperature {
            payload["temperature"] = json!(temperature);
        }

        HttpRequest::post(url, payload)
            .header("x-api-key", credential.expose())
            .header("anthropic-version", ANTHROPIC_VERSION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_request() {
        let config = ProviderConfig::new(LlmProvider::Anthropic, "claude-3-5-sonnet-20241022");
        let credential = Credential::new(LlmProvider::Anthropic, "a-key");
        let request = LlmRequest::new("prompt").with_system_prompt(Some("system"));

        let http = AnthropicProvider.build_request(&request, &config, &credential);

        assert_eq!(http.url, "https://api.anthropic.com/v1/messages");
        assert_eq!(http.header_value("x-api-key"), Some("a-key"));
        assert_eq!(http.header_value("anthropic-version"), Some(ANTHROPIC_VERSION));
        assert_eq!(http.body["system"], "system");
        assert_eq!(http.body["max_tokens"], DEFAULT_MAX_TOKENS);

        let messages = http.body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["role"], "user");
    }
}
