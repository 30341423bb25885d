pub mod assistant;
pub mod client;
pub mod config;
pub mod error_handler;
pub mod extractor;
pub mod prompt;
pub mod providers;
pub mod transport;


pub use assistant::{CodeAssistant, CodeGenerationOutput, TaskOutput};
pub use client::{LlmClient, LlmProvider, LlmRequest, RawProviderResponse};
pub use config::{Credential, ProviderConfig};
pub use error_handler::{ErrorHandler, LlmError, RetryConfig, RetryEvent, recover_default};
pub use extractor::{CodeGenerationResult, parse_code_generation_json};
pub use prompt::{PromptRequest, TaskKind, build_prompt};
pub use providers::{CompletionProvider, for_kind};
pub use transport::{HttpTransport, ReqwestTransport};
