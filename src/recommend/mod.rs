//! Recommendation flow — turning a finished questionnaire into gift ideas.
//!
//! The orchestrator checks and debits the user's credit, asks the generator
//! for suggestions and stores the result as a `SearchRecord`.

pub mod generator;
pub mod orchestrator;
pub mod outcome;
pub mod prompt;
pub mod record;
pub mod routes;

pub use generator::{LlmSuggestionGenerator, SuggestionGenerator};
pub use orchestrator::RecommendationOrchestrator;
pub use outcome::{FailureReason, SubmissionOutcome, SubmissionStatus};
pub use record::SearchRecord;
pub use routes::{QuizRouteState, quiz_routes};
