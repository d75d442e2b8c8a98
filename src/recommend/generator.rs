//! Suggestion generator — turns a prompt into a list of gift ideas.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::error::LlmError;
use crate::llm::provider::{ChatMessage, CompletionRequest, LlmProvider};

/// The generation collaborator. Implementations own their own transport.
#[async_trait]
pub trait SuggestionGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<Vec<String>, LlmError>;
}

/// Default generator backed by an `LlmProvider`.
pub struct LlmSuggestionGenerator {
    llm: Arc<dyn LlmProvider>,
    temperature: f32,
    max_tokens: u32,
}

impl LlmSuggestionGenerator {
    pub fn new(llm: Arc<dyn LlmProvider>, temperature: f32, max_tokens: u32) -> Self {
        Self {
            llm,
            temperature,
            max_tokens,
        }
    }
}

#[async_trait]
impl SuggestionGenerator for LlmSuggestionGenerator {
    async fn generate(&self, prompt: &str) -> Result<Vec<String>, LlmError> {
        let request = CompletionRequest::new(vec![ChatMessage::user(prompt)])
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens);

        let response = self.llm.complete(request).await?;
        let cost = self.llm.estimate_cost(&response);
        info!(
            model = self.llm.model_name(),
            input_tokens = response.input_tokens,
            output_tokens = response.output_tokens,
            cost = %cost,
            "Suggestion generation finished"
        );

        let suggestions = parse_suggestions(&response.content);
        if suggestions.is_empty() {
            warn!(response = %response.content, "No suggestions in LLM response");
            return Err(LlmError::InvalidResponse {
                provider: self.llm.model_name().to_string(),
                reason: "response contained no suggestions".to_string(),
            });
        }
        Ok(suggestions)
    }
}

/// Parse LLM output into suggestion strings.
///
/// Prefers a JSON array of strings; falls back to a numbered or bulleted list.
/// Blank entries are dropped.
pub fn parse_suggestions(text: &str) -> Vec<String> {
    let json_str = extract_json_array(text);
    if let Ok(items) = serde_json::from_str::<Vec<serde_json::Value>>(&json_str) {
        let parsed: Vec<String> = items
            .into_iter()
            .filter_map(|item| match item {
                serde_json::Value::String(s) => Some(s),
                // Some models answer with objects despite being asked for strings.
                serde_json::Value::Object(map) => ["text", "suggestion", "gift"]
                    .iter()
                    .find_map(|k| map.get(*k).and_then(|v| v.as_str()).map(str::to_string)),
                _ => None,
            })
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if !parsed.is_empty() {
            return parsed;
        }
    }

    debug!("Falling back to list parsing");
    parse_list(text)
}

fn list_item_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(?:\d+[.)]|[-*•])\s+(.+?)\s*$").expect("list item regex is valid")
    })
}

fn parse_list(text: &str) -> Vec<String> {
    let re = list_item_regex();
    text.lines()
        .filter_map(|line| re.captures(line))
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .filter(|s| !s.is_empty())
        .collect()
}

/// Extract a JSON array from LLM output that might contain markdown or extra text.
fn extract_json_array(text: &str) -> String {
    let trimmed = text.trim();

    // Already a JSON array
    if trimmed.starts_with('[') {
        return trimmed.to_string();
    }

    // Wrapped in markdown code block
    if let Some(start) = trimmed.find("```json") {
        let after = &trimmed[start + 7..];
        if let Some(end) = after.find("```") {
            return after[..end].trim().to_string();
        }
    }

    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        if let Some(end) = after.find("```") {
            let inner = after[..end].trim();
            if inner.starts_with('[') {
                return inner.to_string();
            }
        }
    }

    // Try to find array bounds
    if let (Some(start), Some(end)) = (trimmed.find('['), trimmed.rfind(']'))
        && end > start
    {
        return trimmed[start..=end].to_string();
    }

    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::provider::CompletionResponse;
    use rust_decimal::Decimal;

    // ── Parsing tests ───────────────────────────────────────────────

    #[test]
    fn parses_plain_array() {
        let out = parse_suggestions(r#"["Vinyl record", "Cooking class"]"#);
        assert_eq!(out, ["Vinyl record", "Cooking class"]);
    }

    #[test]
    fn parses_fenced_array() {
        let input = "Here you go:\n```json\n[\"Board game\", \"  \", \"Plant kit\"]\n```";
        assert_eq!(parse_suggestions(input), ["Board game", "Plant kit"]);
    }

    #[test]
    fn parses_array_inside_prose() {
        let input = "Sure! [\"Scarf\", \"Tea set\"] Hope that helps.";
        assert_eq!(parse_suggestions(input), ["Scarf", "Tea set"]);
    }

    #[test]
    fn parses_object_items() {
        let input = r#"[{"text": "Concert tickets"}, {"gift": "Photo book"}, 3]"#;
        assert_eq!(parse_suggestions(input), ["Concert tickets", "Photo book"]);
    }

    #[test]
    fn falls_back_to_numbered_list() {
        let input = "Ideas:\n1. Hiking boots\n2) Trail map\n- Water bottle\nThanks";
        assert_eq!(
            parse_suggestions(input),
            ["Hiking boots", "Trail map", "Water bottle"]
        );
    }

    #[test]
    fn nothing_usable_is_empty() {
        assert!(parse_suggestions("I cannot help with that.").is_empty());
        assert!(parse_suggestions("[]").is_empty());
    }

    // ── Generator with mock LLM ─────────────────────────────────────

    struct MockLlm {
        response: String,
    }

    #[async_trait]
    impl LlmProvider for MockLlm {
        fn model_name(&self) -> &str {
            "mock-gifts"
        }

        fn cost_per_token(&self) -> (Decimal, Decimal) {
            (Decimal::ZERO, Decimal::ZERO)
        }

        async fn complete(&self, _req: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            Ok(CompletionResponse {
                content: self.response.clone(),
                input_tokens: 100,
                output_tokens: 50,
            })
        }
    }

    struct FailingLlm;

    #[async_trait]
    impl LlmProvider for FailingLlm {
        fn model_name(&self) -> &str {
            "mock-failing"
        }

        fn cost_per_token(&self) -> (Decimal, Decimal) {
            (Decimal::ZERO, Decimal::ZERO)
        }

        async fn complete(&self, _req: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            Err(LlmError::RequestFailed {
                provider: "mock".into(),
                reason: "connection refused".into(),
            })
        }
    }

    #[tokio::test]
    async fn generator_returns_parsed_suggestions() {
        let generator = LlmSuggestionGenerator::new(
            Arc::new(MockLlm {
                response: r#"["A", "B", "C", "D", "E"]"#.into(),
            }),
            0.7,
            512,
        );
        let out = generator.generate("prompt").await.unwrap();
        assert_eq!(out.len(), 5);
    }

    #[tokio::test]
    async fn empty_response_is_invalid() {
        let generator = LlmSuggestionGenerator::new(
            Arc::new(MockLlm {
                response: "no ideas".into(),
            }),
            0.7,
            512,
        );
        let err = generator.generate("prompt").await.unwrap_err();
        assert!(matches!(err, LlmError::InvalidResponse { .. }));
    }

    #[tokio::test]
    async fn provider_error_propagates() {
        let generator = LlmSuggestionGenerator::new(Arc::new(FailingLlm), 0.7, 512);
        let err = generator.generate("prompt").await.unwrap_err();
        assert!(matches!(err, LlmError::RequestFailed { .. }));
    }
}
