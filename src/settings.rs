use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::llm::{Credential, LlmProvider, ProviderConfig, RetryConfig};

/// Persisted CLI preferences. API keys are deliberately absent: they come
/// from `--api-key` or the provider's environment variable on every run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub provider: LlmProvider,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
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
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_max_attempts() -> u32 {
    RetryConfig::default().max_attempts
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Google,
            model: None,
            base_url: None,
            endpoint: None,
            api_version: None,
            deployment_name: None,
            max_tokens: None,
            max_attempts: default_max_attempts(),
        }
    }
}

impl AppConfig {
    /// Defaults if nothing is saved at `path` yet.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: AppConfig = serde_json::from_str(&content)
            .with_context(|| format!("invalid configuration in {}", path.display()))?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(path)?.permissions();
            perms.set_mode(0o600);
            fs::set_permissions(path, perms)?;
        }

        Ok(())
    }

    /// `<config dir>/hexorcist/config.json`
    pub fn config_file_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| anyhow!("Cannot determine config directory"))?;
        Ok(config_dir.join("hexorcist").join("config.json"))
    }

    /// Switching provider drops the settings that belonged to the old one.
    pub fn set_provider(&mut self, provider: LlmProvider) {
        if provider != self.provider {
            *self = Self {
                provider,
                max_attempts: self.max_attempts,
                ..Self::default()
            };
        }
    }

    /// Per-call provider settings, falling back to the provider's default model.
    pub fn provider_config(&self) -> ProviderConfig {
        let model = self
            .model
            .clone()
            .or_else(|| self.deployment_name.clone())
            .or_else(|| self.provider.default_model().map(str::to_string))
            .unwrap_or_default();

        ProviderConfig {
            base_url: self.base_url.clone(),
            endpoint: self.endpoint.clone(),
            api_version: self.api_version.clone(),
            deployment_name: self.deployment_name.clone(),
            max_tokens: self.max_tokens,
            ..ProviderConfig::new(self.provider, model)
        }
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.max_attempts,
        }
    }

    /// Human-readable problems that will make every call fail.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.max_attempts == 0 {
            warnings.push("max_attempts is 0; one attempt will still be made".to_string());
        }

        if self.provider == LlmProvider::AzureOpenAi {
            for (field, value) in [
                ("endpoint", &self.endpoint),
                ("api_version", &self.api_version),
                ("deployment_name", &self.deployment_name),
            ] {
                if value.as_deref().is_none_or(|v| v.trim().is_empty()) {
                    warnings.push(format!("Azure OpenAI requires `{}`", field));
                }
            }
        }

        warnings
    }
}

/// The `--api-key` flag wins over the provider's environment variable.
pub fn resolve_credential(provider: LlmProvider, flag: Option<&str>) -> Credential {
    credential_from(provider, flag, |name| env::var(name).ok())
}

fn credential_from<F>(provider: LlmProvider, flag: Option<&str>, lookup: F) -> Credential
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(key) = flag.filter(|k| !k.trim().is_empty()) {
        return Credential::new(provider, key);
    }

    match provider.api_key_env_var().and_then(|name| lookup(name)) {
        Some(key) => Credential::new(provider, key),
        None => Credential::none(provider),
    }
}
