use serde_json::{Value, json};

use super::CompletionProvider;
use crate::llm::client::{LlmProvider, LlmRequest};
use crate::llm::config::{Credential, ProviderConfig};
use crate::llm::transport::HttpRequest;

/// Gemini over the Generative Language REST API.
#[derive(Debug, Default, Clone, Copy)]
pub struct GoogleProvider;

impl CompletionProvider for GoogleProvider {
    fn kind(&self) -> LlmProvider {
        LlmProvider::Google
    }

    fn build_request(
        &self,
        request: &LlmRequest,
        config: &ProviderConfig,
        credential: &Credential,
    ) -> HttpRequest {
        let url = format!(
            "{}/models/{}:generateContent",
            config.resolved_base_url(),
            config.model
        );

        let mut payload = json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": request.prompt }]
            }]
        });

        if let Some(system) = &request.system_prompt {
            payload["systemInstruction"] = json!({ "parts": [{ "text": system }] });
        }

        let mut generation_config = serde_json::Map::new();
        if request.json_response {
            generation_config.insert("responseMimeType".to_string(), json!("application/json"));
        }
        if let Some(max_tokens) = request.max_tokens.or(config.max_tokens) {
            generation_config.insert("maxOutputTokens".to_string(), json!(max_tokens));
        }
        if let Some(temperature) = request.temperature {
            generation_config.insert("temperature".to_string(), json!(temperature));
        }
        if !generation_config.is_empty() {
            payload["generationConfig"] = Value::Object(generation_config);
        }

        // Generated firmware routinely trips the default dangerous-content filter.
        if request.json_response {
            payload["safetySettings"] = json!([{
                "category": "HARM_CATEGORY_DANGEROUS_CONTENT",
                "threshold": "BLOCK_ONLY_HIGH"
            }]);
        }

        HttpRequest::post(url, payload).header("x-goog-api-key", credential.expose())
    }
}
