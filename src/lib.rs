//! LLM-backed assistant for embedded development: firmware code generation,
//! development guidance and test-case generation across several providers.

pub mod llm;
pub mod output;
pub mod settings;

pub use llm::{
    CodeAssistant, CodeGenerationOutput, CodeGenerationResult, Credential, LlmClient, LlmError,
    LlmProvider, PromptRequest, ProviderConfig, RetryConfig, RetryEvent, TaskKind, TaskOutput,
};
pub use settings::AppConfig;
