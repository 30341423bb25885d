use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::client::{LlmClient, LlmRequest};
use super::config::{Credential, ProviderConfig};
use super::error_handler::{ErrorHandler, LlmError, RetryConfig, RetryEvent};
use super::extractor::{CodeGenerationResult, parse_code_generation_json, unescape_newlines};
use super::prompt::{
    PromptRequest, TaskKind, build_code_generation_prompt, build_guidance_prompt,
    build_test_cases_prompt,
};
use crate::output::render_code_generation_markdown;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeGenerationOutput {
    pub result: CodeGenerationResult,
    /// Documentation and recommendations rendered as one markdown document.
    pub markdown: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutput {
    Code(CodeGenerationOutput),
    Text(String),
}

/// Runs the three embedded-development tasks against any provider.
/// Holds no per-user state: every call carries its own context, config and
/// credential, and overlapping calls share nothing mutable.
pub struct CodeAssistant {
    client: LlmClient,
    error_handler: ErrorHandler,
}

impl CodeAssistant {
    pub fn new(client: LlmClient, retry_config: RetryConfig) -> Self {
        Self {
            client,
            error_handler: ErrorHandler::new(retry_config),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.error_handler.max_attempts()
    }

    pub async fn run<N>(
        &self,
        request: &PromptRequest,
        config: &ProviderConfig,
        credential: &Credential,
        notify: N,
    ) -> Result<TaskOutput, LlmError>
    where
        N: FnMut(RetryEvent<'_>),
    {
        match request.task {
            TaskKind::CodeGeneration => self
                .generate_code(request, config, credential, notify)
                .await
                .map(TaskOutput::Code),
            TaskKind::Guidance => self
                .suggest_guidance(request, config, credential, notify)
                .await
                .map(TaskOutput::Text),
            TaskKind::TestCases => self
                .generate_test_cases(request, config, credential, notify)
                .await
                .map(TaskOutput::Text),
        }
    }

    /// Code generation. The request, extraction and JSON parse are retried
    /// together, so a malformed reply costs one attempt.
    pub async fn generate_code<N>(
        &self,
        request: &PromptRequest,
        config: &ProviderConfig,
        credential: &Credential,
        notify: N,
    ) -> Result<CodeGenerationOutput, LlmError>
    where
        N: FnMut(RetryEvent<'_>),
    {
        let prompt = build_code_generation_prompt(
            &request.language_type,
            &request.hardware_name,
            &request.application_description,
            &request.existing_code,
        );
        let llm_request = task_request(prompt, TaskKind::CodeGeneration);

        info!(provider = %config.provider, model = %config.model, "generating code");
        let client = &self.client;
        let llm_request = &llm_request;
        let result = self
            .error_handler
            .execute_with_retry(
                move || async move {
                    let text = client.generate(llm_request, config, credential).await?;
                    parse_code_generation_json(&text)
                },
                notify,
            )
            .await?;

        debug!(
            recommendations = result.optimization_recommendations.len(),
            "code generation parsed"
        );
        let markdown = render_code_generation_markdown(
            &result.documentation,
            &result.optimization_recommendations,
        );
        Ok(CodeGenerationOutput { result, markdown })
    }

    pub async fn suggest_guidance<N>(
        &self,
        request: &PromptRequest,
        config: &ProviderConfig,
        credential: &Credential,
        notify: N,
    ) -> Result<String, LlmError>
    where
        N: FnMut(RetryEvent<'_>),
    {
        let prompt = build_guidance_prompt(
            &request.existing_code,
            &request.language_type,
            &request.hardware_name,
            &request.application_description,
        );

        info!(provider = %config.provider, model = %config.model, "suggesting guidance");
        let text = self
            .complete_text(task_request(prompt, TaskKind::Guidance), config, credential, notify)
            .await?;
        Ok(unescape_newlines(&text))
    }

    pub async fn generate_test_cases<N>(
        &self,
        request: &PromptRequest,
        config: &ProviderConfig,
        credential: &Credential,
        notify: N,
    ) -> Result<String, LlmError>
    where
        N: FnMut(RetryEvent<'_>),
    {
        let prompt = build_test_cases_prompt(
            &request.existing_code,
            &request.language_type,
            &request.hardware_name,
            &request.application_description,
        );

        info!(provider = %config.provider, model = %config.model, "generating test cases");
        self.complete_text(task_request(prompt, TaskKind::TestCases), config, credential, notify)
            .await
    }

    async fn complete_text<N>(
        &self,
        llm_request: LlmRequest,
        config: &ProviderConfig,
        credential: &Credential,
        notify: N,
    ) -> Result<String, LlmError>
    where
        N: FnMut(RetryEvent<'_>),
    {
        let client = &self.client;
        let llm_request = &llm_request;
        self.error_handler
            .execute_with_retry(
                move || async move { client.generate(llm_request, config, credential).await },
                notify,
            )
            .await
    }
}

fn task_request(prompt: String, task: TaskKind) -> LlmRequest {
    LlmRequest::new(prompt)
        .with_system_prompt(task.system_prompt())
        .with_json_response(task.expects_json())
}
