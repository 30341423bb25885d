use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::LazyLock;
use tracing::debug;

use super::client::LlmProvider;
use super::error_handler::LlmError;

/// Structured output of the code-generation task. Missing keys stay empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeGenerationResult {
    #[serde(default)]
    pub source_code: String,
    #[serde(default)]
    pub documentation: String,
    #[serde(default)]
    pub optimization_recommendations: Vec<String>,
}

static JSON_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\s*```[A-Za-z]*\s*(.*?)\s*```\s*$").expect("valid fence pattern")
});

/// Navigate the provider's envelope down to the generated text. An empty
/// string is a valid result; a missing path is an `Extraction` error.
pub fn extract_text(body: &Value, provider: LlmProvider) -> Result<String, LlmError> {
    match provider {
        LlmProvider::Google => extract_gemini(body),
        LlmProvider::OpenAi | LlmProvider::AzureOpenAi | LlmProvider::Mistral => {
            extract_chat_choice(body, provider)
        }
        LlmProvider::Anthropic => extract_anthropic(body),
        LlmProvider::Ollama => extract_ollama(body),
    }
}

fn extraction_error(provider: LlmProvider, message: impl Into<String>) -> LlmError {
    LlmError::Extraction {
        provider: provider.name().to_string(),
        message: message.into(),
    }
}

fn safety_block(provider: LlmProvider, message: String) -> LlmError {
    LlmError::Provider {
        provider: provider.name().to_string(),
        status: None,
        message,
    }
}

fn extract_gemini(body: &Value) -> Result<String, LlmError> {
    let provider = LlmProvider::Google;

    if let Some(reason) = body["promptFeedback"]["blockReason"].as_str() {
        return Err(safety_block(provider, format!("prompt blocked by safety filters: {}", reason)));
    }

    let candidate = body["candidates"]
        .as_array()
        .and_then(|candidates| candidates.first())
        .ok_or_else(|| extraction_error(provider, "response contained no candidates"))?;

    let part = candidate["content"]["parts"]
        .as_array()
        .and_then(|parts| parts.first());

    match part {
        Some(part) => part["text"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| extraction_error(provider, "first content part has no text")),
        None if candidate["finishReason"] == "SAFETY" => Err(safety_block(
            provider,
            "response blocked by safety filters".to_string(),
        )),
        None => Err(extraction_error(provider, "candidate contained no content parts")),
    }
}

fn extract_chat_choice(body: &Value, provider: LlmProvider) -> Result<String, LlmError> {
    let choice = body["choices"]
        .as_array()
        .and_then(|choices| choices.first())
        .ok_or_else(|| extraction_error(provider, "response contained no choices"))?;

    match choice["message"]["content"].as_str() {
        Some(content) => Ok(content.to_string()),
        None if choice["finish_reason"] == "content_filter" => Err(safety_block(
            provider,
            "response blocked by content filter".to_string(),
        )),
        None => Err(extraction_error(provider, "choice has no message content")),
    }
}

fn extract_anthropic(body: &Value) -> Result<String, LlmError> {
    let provider = LlmProvider::Anthropic;

    let blocks = body["content"]
        .as_array()
        .filter(|blocks| !blocks.is_empty())
        .ok_or_else(|| extraction_error(provider, "response contained no content blocks"))?;

    blocks
        .iter()
        .find_map(|block| block["text"].as_str())
        .map(str::to_string)
        .ok_or_else(|| extraction_error(provider, "no text content block in response"))
}

fn extract_ollama(body: &Value) -> Result<String, LlmError> {
    let provider = LlmProvider::Ollama;

    if let Some(message) = body["error"].as_str() {
        return Err(LlmError::Provider {
            provider: provider.name().to_string(),
            status: None,
            message: message.to_string(),
        });
    }

    body["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| extraction_error(provider, "response has no message content"))
}

/// Strip a surrounding markdown code fence, which prompt-only providers
/// often add around JSON.
pub fn strip_code_fence(text: &str) -> &str {
    match JSON_FENCE.captures(text).and_then(|caps| caps.get(1)) {
        Some(inner) => inner.as_str(),
        None => text.trim(),
    }
}

/// Parse the code-generation payload. Anything that is not a JSON object is
/// a `JsonParse` error carrying the raw text; missing keys default to empty.
pub fn parse_code_generation_json(text: &str) -> Result<CodeGenerationResult, LlmError> {
    let value: Value = serde_json::from_str(strip_code_fence(text)).map_err(|e| {
        debug!(error = %e, raw = %text, "code generation response was not valid JSON");
        LlmError::JsonParse {
            message: e.to_string(),
            raw: text.to_string(),
        }
    })?;

    let object = value.as_object().ok_or_else(|| {
        debug!(raw = %text, "code generation response was not a JSON object");
        LlmError::JsonParse {
            message: "expected a JSON object".to_string(),
            raw: text.to_string(),
        }
    })?;

    // Absent or null means empty; any other non-string is a malformed reply.
    let string_field = |key: &str| match object.get(key) {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(value)) => Ok(value.clone()),
        Some(other) => {
            debug!(key, raw = %text, "code generation field was not a string");
            Err(LlmError::JsonParse {
                message: format!("`{}` must be a string, got {}", key, json_type(other)),
                raw: text.to_string(),
            })
        }
    };

    let optimization_recommendations = match object.get("optimization_recommendations") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .collect(),
        Some(Value::String(single)) if !single.trim().is_empty() => vec![single.clone()],
        _ => Vec::new(),
    };

    Ok(CodeGenerationResult {
        source_code: string_field("source_code")?,
        documentation: string_field("documentation")?,
        optimization_recommendations,
    })
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Turn literal `\n` escape sequences into real newlines. Some models
/// double-escape markdown tables.
pub fn unescape_newlines(text: &str) -> String {
    text.replace("\\n", "\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_full_payload() {
        let text = r#"{"source_code":"x","documentation":"y","optimization_recommendations":["a","b"]}"#;
        let result = parse_code_generation_json(text).unwrap();

        assert_eq!(
            result,
            CodeGenerationResult {
                source_code: "x".to_string(),
                documentation: "y".to_string(),
                optimization_recommendations: vec!["a".to_string(), "b".to_string()],
            }
        );
    }

    #[test]
    fn test_parse_malformed_payload() {
        match parse_code_generation_json("not json").unwrap_err() {
            LlmError::JsonParse { raw, .. } => assert_eq!(raw, "not json"),
            other => panic!("expected JsonParse, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_non_object_payload() {
        assert!(matches!(
            parse_code_generation_json(r#"["source_code"]"#),
            Err(LlmError::JsonParse { .. })
        ));
    }

    #[test]
    fn test_parse_missing_keys_default_to_empty() {
        let result = parse_code_generation_json(r#"{"source_code":"int main(void) {}"}"#).unwrap();
        assert_eq!(result.source_code, "int main(void) {}");
        assert_eq!(result.documentation, "");
        assert!(result.optimization_recommendations.is_empty());

        let result = parse_code_generation_json(r#"{"documentation":null,"optimization_recommendations":null}"#).unwrap();
        assert_eq!(result, CodeGenerationResult::default());
    }

    #[test]
    fn test_parse_rejects_non_string_fields() {
        let text = r#"{"source_code":["int main(void) {","}"],"documentation":"d"}"#;
        match parse_code_generation_json(text).unwrap_err() {
            LlmError::JsonParse { message, raw } => {
                assert!(message.contains("`source_code`"));
                assert!(message.contains("an array"));
                assert_eq!(raw, text);
            }
            other => panic!("expected JsonParse, got {:?}", other),
        }

        let text = r#"{"source_code":"x","documentation":{"summary":"blink"}}"#;
        match parse_code_generation_json(text).unwrap_err() {
            LlmError::JsonParse { message, .. } => {
                assert!(message.contains("`documentation`"));
                assert!(message.contains("an object"));
            }
            other => panic!("expected JsonParse, got {:?}", other),
        }

        assert!(matches!(
            parse_code_generation_json(r#"{"source_code":42}"#),
            Err(LlmError::JsonParse { .. })
        ));
    }

    #[test]
    fn test_parse_one_line_fenced_payload() {
        let text = r#"```json {"source_code":"x"} ```"#;
        assert_eq!(parse_code_generation_json(text).unwrap().source_code, "x");

        let text = r#"```{"documentation":"y"}```"#;
        assert_eq!(parse_code_generation_json(text).unwrap().documentation, "y");
    }

    #[test]
    fn test_parse_fenced_payload() {
        let text = "```json\n{\"source_code\":\"x\",\"optimization_recommendations\":[\"a\"]}\n```";
        let result = parse_code_generation_json(text).unwrap();
        assert_eq!(result.source_code, "x");
        assert_eq!(result.optimization_recommendations, vec!["a".to_string()]);
    }

    #[test]
    fn test_parse_tolerates_odd_recommendation_items() {
        let text = r#"{"optimization_recommendations":["use DMA", null, 3]}"#;
        let result = parse_code_generation_json(text).unwrap();
        assert_eq!(result.optimization_recommendations, vec!["use DMA".to_string(), "3".to_string()]);

        let text = r#"{"optimization_recommendations":"enable -Os"}"#;
        let result = parse_code_generation_json(text).unwrap();
        assert_eq!(result.optimization_recommendations, vec!["enable -Os".to_string()]);
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("  {\"a\":1}  "), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fence("```json\n{\"a\":\n1}\n```\n"), "{\"a\":\n1}");
    }

    #[test]
    fn test_extract_gemini() {
        let body = json!({
            "candidates": [{ "content": { "parts": [{ "text": "generated" }] } }]
        });
        assert_eq!(extract_text(&body, LlmProvider::Google).unwrap(), "generated");
    }

    #[test]
    fn test_extract_gemini_failures() {
        let body = json!({ "candidates": [] });
        assert!(matches!(
            extract_text(&body, LlmProvider::Google),
            Err(LlmError::Extraction { .. })
        ));

        let body = json!({ "candidates": [{ "content": { "parts": [] } }] });
        assert!(matches!(
            extract_text(&body, LlmProvider::Google),
            Err(LlmError::Extraction { .. })
        ));

        let body = json!({ "candidates": [{ "finishReason": "SAFETY" }] });
        assert!(matches!(
            extract_text(&body, LlmProvider::Google),
            Err(LlmError::Provider { .. })
        ));

        let body = json!({ "promptFeedback": { "blockReason": "SAFETY" } });
        match extract_text(&body, LlmProvider::Google).unwrap_err() {
            LlmError::Provider { message, .. } => assert!(message.contains("SAFETY")),
            other => panic!("expected provider error, got {:?}", other),
        }
    }

    #[test]
    fn test_extract_empty_text_is_success() {
        let body = json!({ "choices": [{ "message": { "role": "assistant", "content": "" } }] });
        assert_eq!(extract_text(&body, LlmProvider::Mistral).unwrap(), "");
    }

    #[test]
    fn test_extract_chat_choices() {
        let body = json!({ "choices": [{ "message": { "role": "assistant", "content": "hello" } }] });
        for provider in [LlmProvider::OpenAi, LlmProvider::AzureOpenAi, LlmProvider::Mistral] {
            assert_eq!(extract_text(&body, provider).unwrap(), "hello");
        }

        let body = json!({ "choices": [] });
        assert!(matches!(
            extract_text(&body, LlmProvider::OpenAi),
            Err(LlmError::Extraction { .. })
        ));

        let body = json!({ "choices": [{ "message": { "content": null }, "finish_reason": "content_filter" }] });
        assert!(matches!(
            extract_text(&body, LlmProvider::AzureOpenAi),
            Err(LlmError::Provider { .. })
        ));
    }

    #[test]
    fn test_extract_anthropic() {
        let body = json!({ "content": [{ "type": "text", "text": "tests" }] });
        assert_eq!(extract_text(&body, LlmProvider::Anthropic).unwrap(), "tests");

        let body = json!({ "content": [] });
        assert!(matches!(
            extract_text(&body, LlmProvider::Anthropic),
            Err(LlmError::Extraction { .. })
        ));
    }

    #[test]
    fn test_extract_ollama() {
        let body = json!({ "message": { "role": "assistant", "content": "local" }, "done": true });
        assert_eq!(extract_text(&body, LlmProvider::Ollama).unwrap(), "local");

        let body = json!({ "error": "model not loaded" });
        assert!(matches!(
            extract_text(&body, LlmProvider::Ollama),
            Err(LlmError::Provider { .. })
        ));

        let body = json!({ "response": "generate-style envelope" });
        assert!(matches!(
            extract_text(&body, LlmProvider::Ollama),
            Err(LlmError::Extraction { .. })
        ));
    }

    #[test]
    fn test_unescape_newlines() {
        assert_eq!(unescape_newlines("| a |\\n| b |"), "| a |\n| b |");
        assert_eq!(unescape_newlines("already\nfine"), "already\nfine");
    }
}
