use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use super::config::{Credential, ProviderConfig};
use super::error_handler::LlmError;
use super::extractor;
use super::providers;
use super::transport::{DEFAULT_TIMEOUT, HttpTransport, ReqwestTransport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    Google,
    OpenAi,
    AzureOpenAi,
    Mistral,
    Anthropic,
    Ollama,
}

impl FromStr for LlmProvider {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "google" | "gemini" => Ok(LlmProvider::Google),
            "openai" | "chatgpt" => Ok(LlmProvider::OpenAi),
            "azure" | "azureopenai" | "azure-openai" => Ok(LlmProvider::AzureOpenAi),
            "mistral" => Ok(LlmProvider::Mistral),
            "anthropic" | "claude" => Ok(LlmProvider::Anthropic),
            "ollama" | "local" => Ok(LlmProvider::Ollama),
            _ => Err(LlmError::Configuration {
                provider: s.to_string(),
                message: format!("Unsupported LLM provider: {}", s),
            }),
        }
    }
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl LlmProvider {
    pub const ALL: [LlmProvider; 6] = [
        LlmProvider::Google,
        LlmProvider::OpenAi,
        LlmProvider::AzureOpenAi,
        LlmProvider::Mistral,
        LlmProvider::Anthropic,
        LlmProvider::Ollama,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            LlmProvider::Google => "google",
            LlmProvider::OpenAi => "openai",
            LlmProvider::AzureOpenAi => "azureopenai",
            LlmProvider::Mistral => "mistral",
            LlmProvider::Anthropic => "anthropic",
            LlmProvider::Ollama => "ollama",
        }
    }

    /// Azure has no shared base URL; every resource has its own endpoint.
    pub fn api_base_url(&self) -> Option<&'static str> {
        match self {
            LlmProvider::Google => Some("https://generativelanguage.googleapis.com/v1beta"),
            LlmProvider::OpenAi => Some("https://api.openai.com/v1"),
            LlmProvider::AzureOpenAi => None,
            LlmProvider::Mistral => Some("https://api.mistral.ai/v1"),
            LlmProvider::Anthropic => Some("https://api.anthropic.com/v1"),
            LlmProvider::Ollama => Some("http://localhost:11434"),
        }
    }

    /// Azure addresses a deployment instead of a model id.
    pub fn default_model(&self) -> Option<&'static str> {
        match self {
            LlmProvider::Google => Some("gemini-1.5-flash"),
            LlmProvider::OpenAi => Some("gpt-4o"),
            LlmProvider::AzureOpenAi => None,
            LlmProvider::Mistral => Some("mistral-large-latest"),
            LlmProvider::Anthropic => Some("claude-3-5-sonnet-20241022"),
            LlmProvider::Ollama => Some("llama3"),
        }
    }

    /// Local daemons run without authentication.
    pub fn requires_credential(&self) -> bool {
        !matches!(self, LlmProvider::Ollama)
    }

    /// Only Gemini can be told to return strict JSON.
    pub fn supports_json_mode(&self) -> bool {
        matches!(self, LlmProvider::Google)
    }

    pub fn api_key_env_var(&self) -> Option<&'static str> {
        match self {
            LlmProvider::Google => Some("GOOGLE_API_KEY"),
            LlmProvider::OpenAi => Some("OPENAI_API_KEY"),
            LlmProvider::AzureOpenAi => Some("AZURE_API_KEY"),
            LlmProvider::Mistral => Some("MISTRAL_API_KEY"),
            LlmProvider::Anthropic => Some("ANTHROPIC_API_KEY"),
            LlmProvider::Ollama => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmRequest {
    pub prompt: String,
    pub system_prompt: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    /// Ask for strict JSON where the provider can enforce it.
    #[serde(default)]
    pub json_response: bool,
}

impl LlmRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: Option<&str>) -> Self {
        self.system_prompt = system_prompt.map(str::to_string);
        self
    }

    pub fn with_json_response(mut self, json_response: bool) -> Self {
        self.json_response = json_response;
        self
    }
}

/// The untouched provider envelope from a successful (2xx) call.
#[derive(Debug, Clone)]
pub struct RawProviderResponse {
    pub provider: LlmProvider,
    pub status: u16,
    pub body: Value,
}

impl RawProviderResponse {
    pub fn text(&self) -> Result<String, LlmError> {
        extractor::extract_text(&self.body, self.provider)
    }
}

pub struct LlmClient {
    transport: Arc<dyn HttpTransport>,
}

impl LlmClient {
    pub fn new() -> Result<Self, LlmError> {
        let transport = ReqwestTransport::new(DEFAULT_TIMEOUT).map_err(|e| LlmError::Network {
            provider: "http".to_string(),
            message: format!("failed to build HTTP client: {}", e),
        })?;
        Ok(Self::with_transport(Arc::new(transport)))
    }

    pub fn with_transport(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    /// One round trip to the provider named in `config`.
    pub async fn complete(
        &self,
        request: &LlmRequest,
        config: &ProviderConfig,
        credential: &Credential,
    ) -> Result<RawProviderResponse, LlmError> {
        let provider = providers::for_kind(config.provider);
        provider
            .complete(self.transport.as_ref(), request, config, credential)
            .await
    }

    /// `complete` followed by envelope extraction.
    pub async fn generate(
        &self,
        request: &LlmRequest,
        config: &ProviderConfig,
        credential: &Credential,
    ) -> Result<String, LlmError> {
        self.complete(request, config, credential).await?.text()
    }
}
