use serde_json::json;

use super::{CompletionProvider, apply_chat_options, chat_messages};
use crate::llm::client::{LlmProvider, LlmRequest};
use crate::llm::config::{Credential, ProviderConfig};
use crate::llm::transport::HttpRequest;

/// Azure OpenAI addresses a deployment on a per-resource endpoint.
#[derive(Debug, Default, Clone, Copy)]
pub struct AzureOpenAiProvider;

impl CompletionProvider for AzureOpenAiProvider {
    fn kind(&self) -> LlmProvider {
        LlmProvider::AzureOpenAi
    }

    fn build_request(
        &self,
        request: &LlmRequest,
        config: &ProviderConfig,
        credential: &Credential,
    ) -> HttpRequest {
        let endpoint = config.endpoint.as_deref().unwrap_or_default().trim_end_matches('/');
        let deployment = config.deployment_name.as_deref().unwrap_or_default();
        let api_version = config.api_version.as_deref().unwrap_or_default();

        let url = format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            endpoint, deployment, api_version
        );

        let mut payload = json!({ "messages": chat_messages(request) });
        apply_chat_options(&mut payload, request, config);

        HttpRequest::post(url, payload).header("api-key", credential.expose())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deployment_url() {
        let config = ProviderConfig::azure("https://embedded.openai.azure.com/", "2024-02-01", "gpt4o-prod");
        let credential = Credential::new(LlmProvider::AzureOpenAi, "az-key");
        let request = LlmRequest::new("prompt").with_system_prompt(Some("system"));

        let http = AzureOpenAiProvider.build_request(&request, &config, &credential);

        assert_eq!(
            http.url,
            "https://embedded.openai.azure.com/openai/deployments/gpt4o-prod/chat/completions?api-version=2024-02-01"
        );
        assert_eq!(http.header_value("api-key"), Some("az-key"));
        assert!(http.header_value("Authorization").is_none());
        assert!(http.body.get("model").is_none());
        assert_eq!(http.body["messages"][0]["role"], "system");
    }
}
