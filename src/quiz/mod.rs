//! Gift questionnaire — catalog, answers and the per-session state machine.

pub mod answers;
pub mod catalog;
pub mod session;

pub use answers::{AnswerSet, AnswerValue};
pub use catalog::{Catalog, InputKind, QuestionSpec};
pub use session::{Progress, QuizSession, SessionState};
