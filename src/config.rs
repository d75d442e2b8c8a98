//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::llm::{LlmBackend, LlmConfig};

/// What happens to the debited credit when a submission fails after the debit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefundPolicy {
    /// The credit stays spent, whatever happens downstream.
    #[default]
    Keep,
    /// Re-credit the user when generation fails. Persistence failures still
    /// consume the credit because the suggestions were delivered.
    RefundOnGenerationFailure,
}

impl std::str::FromStr for RefundPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "keep" => Ok(Self::Keep),
            "refund_on_generation_failure" => Ok(Self::RefundOnGenerationFailure),
            other => Err(ConfigError::InvalidValue {
                key: "GIFT_ADVISOR_REFUND_POLICY".to_string(),
                message: format!("expected 'keep' or 'refund_on_generation_failure', got '{other}'"),
            }),
        }
    }
}

/// Submission orchestration settings.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Upper bound on the generation call.
    pub generation_timeout: Duration,
    pub refund_policy: RefundPolicy,
    /// Fewest suggestions the prompt asks for.
    pub min_suggestions: usize,
    /// Most suggestions the prompt asks for; longer answers are truncated.
    pub max_suggestions: usize,
    /// LLM temperature for generation.
    pub temperature: f32,
    /// Max tokens for the LLM response.
    pub max_tokens: u32,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            generation_timeout: Duration::from_secs(60),
            refund_policy: RefundPolicy::Keep,
            min_suggestions: 5,
            max_suggestions: 10,
            temperature: 0.7,
            max_tokens: 2048,
        }
    }
}

/// Process-wide configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub port: u16,
    pub llm: LlmConfig,
    /// Credits granted to a freshly created profile.
    pub initial_credits: u32,
    pub orchestrator: OrchestratorConfig,
}

impl AppConfig {
    /// Build the configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let db_path = std::env::var("GIFT_ADVISOR_DB_PATH")
            .unwrap_or_else(|_| "./data/gift-advisor.db".to_string())
            .into();

        let port: u16 = std::env::var("GIFT_ADVISOR_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(8080);

        let backend = match std::env::var("GIFT_ADVISOR_LLM_BACKEND")
            .unwrap_or_else(|_| "anthropic".to_string())
            .as_str()
        {
            "anthropic" => LlmBackend::Anthropic,
            "openai" => LlmBackend::OpenAi,
            other => {
                return Err(ConfigError::InvalidValue {
                    key: "GIFT_ADVISOR_LLM_BACKEND".to_string(),
                    message: format!("unknown backend '{other}'"),
                });
            }
        };

        let (key_var, default_model) = match backend {
            LlmBackend::Anthropic => ("ANTHROPIC_API_KEY", "claude-sonnet-4-20250514"),
            LlmBackend::OpenAi => ("OPENAI_API_KEY", "gpt-4o"),
        };
        let api_key = std::env::var(key_var)
            .map_err(|_| ConfigError::MissingEnvVar(key_var.to_string()))?;
        let model =
            std::env::var("GIFT_ADVISOR_MODEL").unwrap_or_else(|_| default_model.to_string());

        let initial_credits: u32 = std::env::var("GIFT_ADVISOR_INITIAL_CREDITS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(1);

        let timeout_secs: u64 = std::env::var("GIFT_ADVISOR_GENERATION_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(60);

        let refund_policy = match std::env::var("GIFT_ADVISOR_REFUND_POLICY") {
            Ok(raw) => raw.parse()?,
            Err(_) => RefundPolicy::default(),
        };

        Ok(Self {
            db_path,
            port,
            llm: LlmConfig {
                backend,
                api_key: SecretString::from(api_key),
                model,
            },
            initial_credits,
            orchestrator: OrchestratorConfig {
                generation_timeout: Duration::from_secs(timeout_secs),
                refund_policy,
                ..OrchestratorConfig::default()
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refund_policy_parses_known_values() {
        assert_eq!("keep".parse::<RefundPolicy>().unwrap(), RefundPolicy::Keep);
        assert_eq!(
            "refund_on_generation_failure".parse::<RefundPolicy>().unwrap(),
            RefundPolicy::RefundOnGenerationFailure
        );
    }

    #[test]
    fn refund_policy_rejects_unknown_value() {
        let err = "always".parse::<RefundPolicy>().unwrap_err();
        assert!(err.to_string().contains("GIFT_ADVISOR_REFUND_POLICY"));
    }

    #[test]
    fn orchestrator_defaults_match_prompt_bounds() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.min_suggestions, 5);
        assert_eq!(config.max_suggestions, 10);
        assert_eq!(config.refund_policy, RefundPolicy::Keep);
        assert_eq!(config.generation_timeout, Duration::from_secs(60));
    }
}
