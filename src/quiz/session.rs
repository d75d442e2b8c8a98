//! Questionnaire session state machine.
//!
//! Progresses linearly: AtStep(0) → … → AtStep(N-1) → Submitting, then the
//! orchestrator moves it to Completed or Failed. Answers can only change while
//! the session is at a step, and only for the question of that step.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::ValidationError;
use crate::recommend::FailureReason;

use super::answers::{AnswerSet, AnswerValue};
use super::catalog::{Catalog, InputKind, QuestionSpec};

/// Where a session is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    AtStep { index: usize },
    Submitting,
    Completed,
    Failed { reason: FailureReason },
}

impl SessionState {
    /// Whether the orchestrator has finished with this session.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed { .. })
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AtStep { index } => write!(f, "at_step({index})"),
            Self::Submitting => write!(f, "submitting"),
            Self::Completed => write!(f, "completed"),
            Self::Failed { reason } => write!(f, "failed({reason})"),
        }
    }
}

/// "Question 3 of 10" for the quiz header.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Progress {
    /// 1-based step number.
    pub step: usize,
    pub total: usize,
    pub percent: f32,
}

/// One user's traversal of the questionnaire. Owned by a single caller.
///
/// The catalog is not serialized: a deserialized session is always bound to
/// the built-in gift questionnaire. Sessions over a custom catalog must be
/// rebuilt with `from_answers` instead of round-tripping through serde.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizSession {
    id: Uuid,
    #[serde(skip, default = "Catalog::gift_quiz")]
    catalog: Arc<Catalog>,
    state: SessionState,
    answers: AnswerSet,
    created_at: DateTime<Utc>,
}

impl QuizSession {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            id: Uuid::new_v4(),
            catalog,
            state: SessionState::AtStep { index: 0 },
            answers: AnswerSet::new(),
            created_at: Utc::now(),
        }
    }

    /// A session over the built-in gift questionnaire.
    pub fn gift_quiz() -> Self {
        Self::new(Catalog::gift_quiz())
    }

    /// Replay a full answer set through the questionnaire, as a stateless
    /// caller would by clicking through every step. The result is in
    /// `Submitting` on success.
    pub fn from_answers(catalog: Arc<Catalog>, answers: &AnswerSet) -> Result<Self, ValidationError> {
        if let Some((unknown, _)) = answers.iter().find(|(id, _)| catalog.find(id).is_none()) {
            return Err(ValidationError::UnknownQuestion(unknown.to_string()));
        }

        let mut session = Self::new(catalog);
        while let SessionState::AtStep { index } = session.state {
            let question_id = session.catalog.get(index).map(|q| q.id).unwrap_or_default();
            if let Some(value) = answers.get(question_id) {
                session.record_answer(question_id, value.clone())?;
            }
            session.advance()?;
        }
        Ok(session)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn answers(&self) -> &AnswerSet {
        &self.answers
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// The question being answered, if the session is at a step.
    pub fn current_question(&self) -> Option<&QuestionSpec> {
        match self.state {
            SessionState::AtStep { index } => self.catalog.get(index),
            _ => None,
        }
    }

    pub fn progress(&self) -> Progress {
        let total = self.catalog.len();
        let step = match self.state {
            SessionState::AtStep { index } => index + 1,
            _ => total,
        };
        Progress {
            step,
            total,
            percent: step as f32 / total as f32 * 100.0,
        }
    }

    /// Whether the answer for step `index` lets the user move on.
    pub fn is_step_complete(&self, index: usize) -> bool {
        let Some(question) = self.catalog.get(index) else {
            return false;
        };
        let answer = self.answers.get(question.id);
        match question.kind {
            InputKind::SingleChoice => {
                matches!(answer, Some(AnswerValue::Choice(label)) if !label.is_empty())
            }
            InputKind::MultiChoice { max_selections } => matches!(
                answer,
                Some(AnswerValue::Choices(labels)) if !labels.is_empty() && labels.len() <= max_selections
            ),
            InputKind::FreeText { required } => {
                !required
                    || matches!(answer, Some(AnswerValue::Text(text)) if !text.trim().is_empty())
            }
        }
    }

    /// Store an answer for the current question.
    ///
    /// Writes to any other question are rejected and nothing is stored when
    /// the value does not fit the question.
    pub fn record_answer(
        &mut self,
        question_id: &str,
        value: AnswerValue,
    ) -> Result<(), ValidationError> {
        let question = self.current_for_write(question_id)?;
        let normalized = normalize(question, value)?;
        let id = question.id;
        self.answers.set(id, normalized);
        debug!(session_id = %self.id, question_id = id, "Answer recorded");
        Ok(())
    }

    /// Select or deselect one label of the current multi-choice question.
    ///
    /// Selecting beyond the question's maximum is ignored and returns
    /// `Ok(false)`. Deselecting is always allowed. Returns whether the answer
    /// changed.
    pub fn toggle_choice(&mut self, label: &str, selected: bool) -> Result<bool, ValidationError> {
        let question = self.current_question().ok_or_else(|| ValidationError::NotEditable {
            state: self.state.to_string(),
        })?;
        let InputKind::MultiChoice { max_selections } = question.kind else {
            return Err(ValidationError::KindMismatch {
                question_id: question.id.to_string(),
                expected: question.kind.describe(),
            });
        };
        if !question.has_option(label) {
            return Err(ValidationError::UnknownOption {
                question_id: question.id.to_string(),
                label: label.to_string(),
            });
        }

        let id = question.id;
        let mut labels = self
            .answers
            .get(id)
            .and_then(AnswerValue::labels)
            .map(<[String]>::to_vec)
            .unwrap_or_default();
        let present = labels.iter().any(|l| l == label);

        let changed = match (selected, present) {
            (true, true) | (false, false) => false,
            (true, false) if labels.len() >= max_selections => {
                debug!(question_id = id, label, max_selections, "Selection limit reached, ignoring");
                false
            }
            (true, false) => {
                labels.push(label.to_string());
                true
            }
            (false, true) => {
                labels.retain(|l| l != label);
                true
            }
        };
        if changed {
            self.answers.set(id, AnswerValue::Choices(labels));
        }
        Ok(changed)
    }

    /// Move forward. The last step moves the session to `Submitting`.
    pub fn advance(&mut self) -> Result<SessionState, ValidationError> {
        let SessionState::AtStep { index } = self.state else {
            return Err(ValidationError::NotEditable {
                state: self.state.to_string(),
            });
        };
        if !self.is_step_complete(index) {
            let question_id = self.catalog.get(index).map(|q| q.id).unwrap_or_default();
            return Err(ValidationError::IncompleteStep {
                question_id: question_id.to_string(),
            });
        }

        self.state = if index + 1 < self.catalog.len() {
            SessionState::AtStep { index: index + 1 }
        } else {
            SessionState::Submitting
        };
        debug!(session_id = %self.id, state = %self.state, "Session advanced");
        Ok(self.state)
    }

    /// Move back one step. No-op on the first step or outside the steps.
    pub fn retreat(&mut self) -> SessionState {
        if let SessionState::AtStep { index } = self.state {
            if index > 0 {
                self.state = SessionState::AtStep { index: index - 1 };
            }
        }
        self.state
    }

    /// A fresh session at the final step carrying this session's answers.
    /// Only failed sessions can be resumed; resubmitting spends a new credit.
    pub fn resume_after_failure(&self) -> Option<QuizSession> {
        let SessionState::Failed { .. } = self.state else {
            return None;
        };
        let mut resumed = Self::new(Arc::clone(&self.catalog));
        resumed.answers = self.answers.clone();
        resumed.state = SessionState::AtStep {
            index: self.catalog.len() - 1,
        };
        Some(resumed)
    }

    pub(crate) fn complete(&mut self) {
        if self.state == SessionState::Submitting {
            self.state = SessionState::Completed;
        }
    }

    pub(crate) fn fail(&mut self, reason: FailureReason) {
        if self.state == SessionState::Submitting {
            self.state = SessionState::Failed { reason };
        }
    }

    /// The current question, provided it is the one being written.
    fn current_for_write(&self, question_id: &str) -> Result<&QuestionSpec, ValidationError> {
        let current = self.current_question().ok_or_else(|| ValidationError::NotEditable {
            state: self.state.to_string(),
        })?;
        if current.id == question_id {
            return Ok(current);
        }
        if self.catalog.find(question_id).is_none() {
            return Err(ValidationError::UnknownQuestion(question_id.to_string()));
        }
        Err(ValidationError::OutOfOrder {
            question_id: question_id.to_string(),
            current: current.id.to_string(),
        })
    }
}

/// Check `value` against the question kind and coerce it to the canonical variant.
fn normalize(question: &QuestionSpec, value: AnswerValue) -> Result<AnswerValue, ValidationError> {
    let mismatch = || ValidationError::KindMismatch {
        question_id: question.id.to_string(),
        expected: question.kind.describe(),
    };

    match question.kind {
        InputKind::SingleChoice => {
            let label = value.as_str().ok_or_else(mismatch)?;
            if !question.has_option(label) {
                return Err(ValidationError::UnknownOption {
                    question_id: question.id.to_string(),
                    label: label.to_string(),
                });
            }
            Ok(AnswerValue::Choice(label.to_string()))
        }
        InputKind::MultiChoice { max_selections } => {
            let raw = value.labels().ok_or_else(mismatch)?;
            let mut labels: Vec<String> = Vec::with_capacity(raw.len());
            for label in raw {
                if !question.has_option(label) {
                    return Err(ValidationError::UnknownOption {
                        question_id: question.id.to_string(),
                        label: label.clone(),
                    });
                }
                if !labels.contains(label) {
                    labels.push(label.clone());
                }
            }
            if labels.len() > max_selections {
                return Err(ValidationError::TooManySelections {
                    question_id: question.id.to_string(),
                    max: max_selections,
                    got: labels.len(),
                });
            }
            Ok(AnswerValue::Choices(labels))
        }
        InputKind::FreeText { .. } => {
            let text = value.as_str().ok_or_else(mismatch)?;
            Ok(AnswerValue::Text(text.to_string()))
        }
    }
}
