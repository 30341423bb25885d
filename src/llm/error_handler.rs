use std::fmt;
use std::future::Future;
use thiserror::Error;
use tracing::{debug, error, warn};

/// Attempt budget for a single user-triggered task.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_attempts: 3 }
    }
}

#[derive(Debug, Clone, Error)]
pub enum LlmError {
    #[error("Configuration error for {provider}: {message}")]
    Configuration { provider: String, message: String },

    #[error("Network error with {provider}: {message}")]
    Network { provider: String, message: String },

    #[error("Authentication error with {provider}: {message}")]
    Authentication { provider: String, message: String },

    #[error("Provider error from {provider}{}: {message}", status_suffix(.status))]
    Provider {
        provider: String,
        status: Option<u16>,
        message: String,
    },

    #[error("Unexpected response shape from {provider}: {message}")]
    Extraction { provider: String, message: String },

    /// The raw model output is kept so the caller can show it to the user.
    #[error("Response was not valid JSON: {message}")]
    JsonParse { message: String, raw: String },

    #[error("Gave up after {attempts} attempts: {last_error}")]
    RetryExhausted {
        attempts: u32,
        #[source]
        last_error: Box<LlmError>,
    },
}

fn status_suffix(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" (HTTP {})", code),
        None => String::new(),
    }
}

impl LlmError {
    /// Configuration and credential problems do not change between attempts.
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::Configuration { .. } => false,
            LlmError::Authentication { .. } => false,
            LlmError::RetryExhausted { .. } => false,
            LlmError::Network { .. } => true,
            LlmError::Provider { .. } => true,
            LlmError::Extraction { .. } => true,
            LlmError::JsonParse { .. } => true,
        }
    }

    /// The innermost error, looking through `RetryExhausted`.
    pub fn root(&self) -> &LlmError {
        match self {
            LlmError::RetryExhausted { last_error, .. } => last_error.root(),
            other => other,
        }
    }

    /// Raw model output attached to a JSON parse failure, if any.
    pub fn raw_output(&self) -> Option<&str> {
        match self.root() {
            LlmError::JsonParse { raw, .. } => Some(raw.as_str()),
            _ => None,
        }
    }
}

/// Progress reported to the caller while a task is being retried.
#[derive(Debug)]
pub enum RetryEvent<'a> {
    Transient {
        attempt: u32,
        max_attempts: u32,
        error: &'a LlmError,
    },
    Exhausted {
        attempts: u32,
        error: &'a LlmError,
    },
}

impl fmt::Display for RetryEvent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryEvent::Transient { attempt, max_attempts, error } => write!(
                f,
                "Attempt {}/{} failed: {}. Retrying attempt {}/{}...",
                attempt,
                max_attempts,
                error,
                attempt + 1,
                max_attempts
            ),
            RetryEvent::Exhausted { attempts, error } => {
                write!(f, "Failed after {} attempts: {}", attempts, error)
            }
        }
    }
}

pub struct ErrorHandler {
    config: RetryConfig,
}

impl ErrorHandler {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn max_attempts(&self) -> u32 {
        self.config.max_attempts.max(1)
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error,
    /// or the attempt budget is spent. Attempts are sequential and immediate.
    pub async fn execute_with_retry<F, Fut, T, N>(
        &self,
        mut operation: F,
        mut notify: N,
    ) -> Result<T, LlmError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, LlmError>>,
        N: FnMut(RetryEvent<'_>),
    {
        let max_attempts = self.max_attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;

            match operation().await {
                Ok(result) => {
                    if attempt > 1 {
                        debug!(attempt, "operation succeeded after retry");
                    }
                    return Ok(result);
                }
                Err(err) if !err.is_retryable() => {
                    error!(attempt, error = %err, "non-retryable failure");
                    return Err(err);
                }
                Err(err) if attempt >= max_attempts => {
                    error!(attempts = attempt, error = %err, "retry budget exhausted");
                    notify(RetryEvent::Exhausted { attempts: attempt, error: &err });
                    return Err(LlmError::RetryExhausted {
                        attempts: attempt,
                        last_error: Box::new(err),
                    });
                }
                Err(err) => {
                    warn!(attempt, max_attempts, error = %err, "transient failure, retrying");
                    notify(RetryEvent::Transient { attempt, max_attempts, error: &err });
                }
            }
        }
    }
}

impl Default for ErrorHandler {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}

/// Split a task result into a renderable value and the error, if any.
/// On failure the value is the empty default so the UI never sees a hole.
pub fn recover_default<T: Default>(result: Result<T, LlmError>) -> (T, Option<LlmError>) {
    match result {
        Ok(value) => (value, None),
        Err(err) => (T::default(), Some(err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn network_error() -> LlmError {
        LlmError::Network {
            provider: "test".to_string(),
            message: "Connection failed".to_string(),
        }
    }

    #[test]
    fn test_retryable_errors() {
        assert!(network_error().is_retryable());

        let json_error = LlmError::JsonParse {
            message: "expected value".to_string(),
            raw: "not json".to_string(),
        };
        assert!(json_error.is_retryable());

        let auth_error = LlmError::Authentication {
            provider: "test".to_string(),
            message: "Invalid key".to_string(),
        };
        assert!(!auth_error.is_retryable());

        let config_error = LlmError::Configuration {
            provider: "test".to_string(),
            message: "missing model".to_string(),
        };
        assert!(!config_error.is_retryable());
    }

    #[test]
    fn test_provider_error_display_includes_status() {
        let err = LlmError::Provider {
            provider: "google".to_string(),
            status: Some(503),
            message: "overloaded".to_string(),
        };
        assert_eq!(err.to_string(), "Provider error from google (HTTP 503): overloaded");

        let err = LlmError::Provider {
            provider: "google".to_string(),
            status: None,
            message: "blocked".to_string(),
        };
        assert_eq!(err.to_string(), "Provider error from google: blocked");
    }

    #[tokio::test]
    async fn test_retry_logic() {
        let handler = ErrorHandler::default();

        let mut attempt_count = 0;
        let mut transient = Vec::new();
        let result = handler
            .execute_with_retry(
                || {
                    attempt_count += 1;
                    let current = attempt_count;
                    async move {
                        if current < 3 {
                            Err(network_error())
                        } else {
                            Ok("Success")
                        }
                    }
                },
                |event| {
                    if let RetryEvent::Transient { attempt, .. } = event {
                        transient.push(attempt);
                    }
                },
            )
            .await;

        assert_eq!(result.unwrap(), "Success");
        assert_eq!(attempt_count, 3);
        assert_eq!(transient, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_exhaustion_wraps_last_error() {
        let handler = ErrorHandler::new(RetryConfig { max_attempts: 3 });

        let mut attempt_count = 0;
        let mut events = Vec::new();
        let result: Result<(), LlmError> = handler
            .execute_with_retry(
                || {
                    attempt_count += 1;
                    let current = attempt_count;
                    async move {
                        Err(LlmError::Provider {
                            provider: "test".to_string(),
                            status: Some(500),
                            message: format!("failure {}", current),
                        })
                    }
                },
                |event| events.push(event.to_string()),
            )
            .await;

        assert_eq!(attempt_count, 3);
        match result.unwrap_err() {
            LlmError::RetryExhausted { attempts, last_error } => {
                assert_eq!(attempts, 3);
                match *last_error {
                    LlmError::Provider { message, .. } => assert_eq!(message, "failure 3"),
                    other => panic!("unexpected inner error: {:?}", other),
                }
            }
            other => panic!("expected RetryExhausted, got {:?}", other),
        }
        assert_eq!(events.len(), 3);
        assert!(events[0].contains("Retrying attempt 2/3"));
        assert!(events[2].starts_with("Failed after 3 attempts"));
    }

    #[tokio::test]
    async fn test_non_retryable_fails_fast() {
        let handler = ErrorHandler::default();

        let mut attempt_count = 0;
        let mut event_count = 0;
        let result: Result<(), LlmError> = handler
            .execute_with_retry(
                || {
                    attempt_count += 1;
                    async {
                        Err(LlmError::Configuration {
                            provider: "azureopenai".to_string(),
                            message: "missing required field `endpoint`".to_string(),
                        })
                    }
                },
                |_| event_count += 1,
            )
            .await;

        assert_eq!(attempt_count, 1);
        assert_eq!(event_count, 0);
        assert!(matches!(result, Err(LlmError::Configuration { .. })));
    }

    #[tokio::test]
    async fn test_zero_attempt_budget_still_runs_once() {
        let handler = ErrorHandler::new(RetryConfig { max_attempts: 0 });

        let mut attempt_count = 0;
        let result: Result<(), LlmError> = handler
            .execute_with_retry(
                || {
                    attempt_count += 1;
                    async { Err(network_error()) }
                },
                |_| {},
            )
            .await;

        assert_eq!(attempt_count, 1);
        assert!(matches!(result, Err(LlmError::RetryExhausted { attempts: 1, .. })));
    }

    #[test]
    fn test_raw_output_survives_wrapping() {
        let err = LlmError::RetryExhausted {
            attempts: 3,
            last_error: Box::new(LlmError::JsonParse {
                message: "expected value".to_string(),
                raw: "not json".to_string(),
            }),
        };
        assert_eq!(err.raw_output(), Some("not json"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_recover_default() {
        let (value, err) = recover_default::<Vec<String>>(Err(network_error()));
        assert!(value.is_empty());
        assert!(err.is_some());

        let (value, err) = recover_default(Ok::<_, LlmError>("done".to_string()));
        assert_eq!(value, "done");
        assert!(err.is_none());
    }
}
