//! Error types for Gift Advisor.

/// Top-level error type for the service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },
}

/// Questionnaire input errors. Raised synchronously by the session and never
/// reach the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Question {question_id} is not answered yet")]
    IncompleteStep { question_id: String },

    #[error("Question {question_id} is not the current step (current: {current})")]
    OutOfOrder { question_id: String, current: String },

    #[error("Unknown question: {0}")]
    UnknownQuestion(String),

    #[error("'{label}' is not an option for question {question_id}")]
    UnknownOption { question_id: String, label: String },

    #[error("Question {question_id} expects a {expected} answer")]
    KindMismatch {
        question_id: String,
        expected: &'static str,
    },

    #[error("Question {question_id} accepts at most {max} selections, got {got}")]
    TooManySelections {
        question_id: String,
        max: usize,
        got: usize,
    },

    #[error("Session is {state}, answers can no longer change")]
    NotEditable { state: String },

    #[error("Session is {state}, not ready to submit")]
    NotReady { state: String },
}

/// Credit ledger errors.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Insufficient credit for {user_id}: balance is {balance}")]
    InsufficientCredit { user_id: String, balance: u32 },

    #[error("No account for user {0}")]
    UnknownAccount(String),

    #[error("Credit amount {0} is zero or would overflow the balance")]
    InvalidAmount(u32),

    #[error("Ledger store failed: {0}")]
    Database(#[from] DatabaseError),
}

/// Result type alias for the service.
pub type Result<T> = std::result::Result<T, Error>;
