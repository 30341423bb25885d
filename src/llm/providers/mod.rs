//! One `CompletionProvider` per LLM vendor. Each variant knows its own URL,
//! authentication and request body; status handling is shared.

pub mod anthropic;
pub mod azure;
pub mod google;
pub mod mistral;
pub mod ollama;
pub mod openai;

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;

use super::client::{LlmProvider, LlmRequest, RawProviderResponse};
use super::config::{Credential, ProviderConfig};
use super::error_handler::LlmError;
use super::transport::{HttpRequest, HttpResponse, HttpTransport};

pub use anthropic::AnthropicProvider;
pub use azure::AzureOpenAiProvider;
pub use google::GoogleProvider;
pub use mistral::MistralProvider;
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    fn kind(&self) -> LlmProvider;

    /// Shape the HTTP request. `config` has already been validated.
    fn build_request(
        &self,
        request: &LlmRequest,
        config: &ProviderConfig,
        credential: &Credential,
    ) -> HttpRequest;

    /// Validate, send exactly once, and classify the HTTP outcome.
    async fn complete(
        &self,
        transport: &dyn HttpTransport,
        request: &LlmRequest,
        config: &ProviderConfig,
        credential: &Credential,
    ) -> Result<RawProviderResponse, LlmError> {
        config.validate(credential)?;

        let http_request = self.build_request(request, config, credential);
        debug!(provider = %self.kind(), url = %redact_query(&http_request.url), "sending completion request");

        let response = transport
            .post_json(http_request)
            .await
            .map_err(|e| LlmError::Network {
                provider: self.kind().name().to_string(),
                message: if e.timed_out {
                    format!("request timed out: {}", e.message)
                } else {
                    e.message
                },
            })?;

        classify_response(self.kind(), response)
    }
}

pub fn for_kind(kind: LlmProvider) -> Box<dyn CompletionProvider> {
    match kind {
        LlmProvider::Google => Box::new(GoogleProvider),
        LlmProvider::OpenAi => Box::new(OpenAiProvider),
        LlmProvider::AzureOpenAi => Box::new(AzureOpenAiProvider),
        LlmProvider::Mistral => Box::new(MistralProvider),
        LlmProvider::Anthropic => Box::new(AnthropicProvider),
        LlmProvider::Ollama => Box::new(OllamaProvider),
    }
}

/// 401/403 are credential problems; every other non-2xx is the provider's.
pub fn classify_response(
    provider: LlmProvider,
    response: HttpResponse,
) -> Result<RawProviderResponse, LlmError> {
    let name = provider.name().to_string();

    if response.is_success() {
        let body: Value = serde_json::from_str(&response.body).map_err(|e| LlmError::Extraction {
            provider: name,
            message: format!("response body was not JSON: {}", e),
        })?;
        return Ok(RawProviderResponse {
            provider,
            status: response.status,
            body,
        });
    }

    let message = error_message(&response.body);
    match response.status {
        401 | 403 => Err(LlmError::Authentication { provider: name, message }),
        status => Err(LlmError::Provider {
            provider: name,
            status: Some(status),
            message,
        }),
    }
}

/// Pull `error.message` out of the common error envelopes, else the body.
fn error_message(body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let from_json = parsed.as_ref().and_then(|json| {
        json["error"]["message"]
            .as_str()
            .or_else(|| json["error"].as_str())
            .or_else(|| json["message"].as_str())
            .map(str::to_string)
    });

    match from_json {
        Some(message) => message,
        None if body.trim().is_empty() => "empty error response".to_string(),
        None => body.trim().to_string(),
    }
}

/// Chat-style message list: optional system message, then the user prompt.
pub(crate) fn chat_messages(request: &LlmRequest) -> Vec<Value> {
    let mut messages = Vec::with_capacity(2);
    if let Some(system) = &request.system_prompt {
        messages.push(json!({ "role": "system", "content": system }));
    }
    messages.push(json!({ "role": "user", "content": request.prompt }));
    messages
}

/// Sampling options shared by the OpenAI-compatible chat APIs.
pub(crate) fn apply_chat_options(payload: &mut Value, request: &LlmRequest, config: &ProviderConfig) {
    if let Some(max_tokens) = request.max_tokens.or(config.max_tokens) {
        payload["max_tokens"] = json!(max_tokens);
    }
    if let Some(temperature) = request.temperature {
        payload["temperature"] = json!(temperature);
    }
}

fn redact_query(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}
