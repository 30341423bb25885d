use serde::{Deserialize, Serialize};
use std::fmt;

use super::client::LlmProvider;
use super::error_handler::LlmError;

/// Per-call provider settings. Which optional fields are required depends
/// on `provider`; see [`ProviderConfig::validate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub provider: LlmProvider,
    #[serde(default)]
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl ProviderConfig {
    pub fn new(provider: LlmProvider, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            base_url: None,
            endpoint: None,
            api_version: None,
            deployment_name: None,
            max_tokens: None,
        }
    }

    /// Config using the provider's default model.
    pub fn with_default_model(provider: LlmProvider) -> Self {
        Self::new(provider, provider.default_model().unwrap_or_default())
    }

    pub fn azure(
        endpoint: impl Into<String>,
        api_version: impl Into<String>,
        deployment_name: impl Into<String>,
    ) -> Self {
        let deployment_name = deployment_name.into();
        Self {
            endpoint: Some(endpoint.into()),
            api_version: Some(api_version.into()),
            deployment_name: Some(deployment_name.clone()),
            ..Self::new(LlmProvider::AzureOpenAi, deployment_name)
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Custom base URL, or the provider's public one. Empty for Azure,
    /// which builds its URL from `endpoint`.
    pub fn resolved_base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .or(self.provider.api_base_url())
            .unwrap_or_default()
            .trim_end_matches('/')
    }

    /// Checked before any request is built so a bad config never reaches
    /// the network.
    pub fn validate(&self, credential: &Credential) -> Result<(), LlmError> {
        if credential.provider() != self.provider {
            return Err(self.config_error(format!(
                "credential was issued for {}, not {}",
                credential.provider(),
                self.provider
            )));
        }

        match self.provider {
            LlmProvider::AzureOpenAi => {
                self.require("endpoint", self.endpoint.as_deref())?;
                self.require("api_version", self.api_version.as_deref())?;
                self.require("deployment_name", self.deployment_name.as_deref())?;
            }
            _ => self.require("model", Some(self.model.as_str()))?,
        }

        if self.provider.requires_credential() && credential.is_empty() {
            return Err(self.config_error("missing API key".to_string()));
        }

        Ok(())
    }

    fn require(&self, field: &str, value: Option<&str>) -> Result<(), LlmError> {
        match value {
            Some(v) if !v.trim().is_empty() => Ok(()),
            _ => Err(self.config_error(format!("missing required field `{}`", field))),
        }
    }

    fn config_error(&self, message: String) -> LlmError {
        LlmError::Configuration {
            provider: self.provider.name().to_string(),
            message,
        }
    }
}

/// API key for one provider. Supplied by the caller on every call and never
/// stored by the core.
#[derive(Clone)]
pub struct Credential {
    provider: LlmProvider,
    key: String,
}

impl Credential {
    pub fn new(provider: LlmProvider, key: impl Into<String>) -> Self {
        Self {
            provider,
            key: key.into(),
        }
    }

    /// For providers that run without authentication.
    pub fn none(provider: LlmProvider) -> Self {
        Self::new(provider, String::new())
    }

    pub fn provider(&self) -> LlmProvider {
        self.provider
    }

    pub fn expose(&self) -> &str {
        &self.key
    }

    pub fn is_empty(&self) -> bool {
        self.key.trim().is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("provider", &self.provider)
            .field("key", &"<redacted>")
            .finish()
    }
}
