//! What a submission hands back to its caller.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::quiz::AnswerSet;

/// Why a submission ended in `Failed`. Every reason is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// Balance was, or became, zero before the debit.
    InsufficientCredit,
    /// Generation errored, timed out, or returned nothing usable.
    GenerationFailed,
    /// Suggestions were generated but could not be stored.
    PersistFailed,
    /// The balance could not be read; no credit was spent.
    LedgerUnavailable,
}

impl FailureReason {
    /// Human-readable message shown to the user.
    pub fn message(&self) -> &'static str {
        match self {
            Self::InsufficientCredit => {
                "You don't have enough credits. Top up your account and submit again; your answers were kept."
            }
            Self::GenerationFailed => {
                "We couldn't generate gift suggestions right now. Please try again later."
            }
            Self::PersistFailed => {
                "Here are your suggestions, but we couldn't save them to your history. Copy them before leaving this page."
            }
            Self::LedgerUnavailable => {
                "We couldn't check your credit balance. Nothing was charged; please try again."
            }
        }
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::InsufficientCredit => "insufficient_credit",
            Self::GenerationFailed => "generation_failed",
            Self::PersistFailed => "persist_failed",
            Self::LedgerUnavailable => "ledger_unavailable",
        };
        write!(f, "{s}")
    }
}

/// Final status of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Completed,
    Failed,
}

/// Result of one submission, returned to the caller for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionOutcome {
    pub session_id: Uuid,
    pub status: SubmissionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<FailureReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub answers: AnswerSet,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<String>>,
    /// Balance after the last committed ledger change of this submission.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<Uuid>,
}

impl SubmissionOutcome {
    pub fn completed(
        session_id: Uuid,
        answers: AnswerSet,
        suggestions: Vec<String>,
        balance: u32,
        record_id: Uuid,
    ) -> Self {
        Self {
            session_id,
            status: SubmissionStatus::Completed,
            reason: None,
            message: None,
            answers,
            suggestions: Some(suggestions),
            balance: Some(balance),
            record_id: Some(record_id),
        }
    }

    pub fn failed(session_id: Uuid, reason: FailureReason, answers: AnswerSet) -> Self {
        Self {
            session_id,
            status: SubmissionStatus::Failed,
            reason: Some(reason),
            message: Some(reason.message().to_string()),
            answers,
            suggestions: None,
            balance: None,
            record_id: None,
        }
    }

    pub fn with_balance(mut self, balance: u32) -> Self {
        self.balance = Some(balance);
        self
    }

    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.suggestions = Some(suggestions);
        self
    }

    pub fn is_completed(&self) -> bool {
        self.status == SubmissionStatus::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_distinct() {
        let reasons = [
            FailureReason::InsufficientCredit,
            FailureReason::GenerationFailed,
            FailureReason::PersistFailed,
            FailureReason::LedgerUnavailable,
        ];
        for (i, a) in reasons.iter().enumerate() {
            for b in &reasons[i + 1..] {
                assert_ne!(a.message(), b.message());
            }
        }
    }

    #[test]
    fn display_matches_serde() {
        for reason in [
            FailureReason::InsufficientCredit,
            FailureReason::GenerationFailed,
            FailureReason::PersistFailed,
            FailureReason::LedgerUnavailable,
        ] {
            let json = serde_json::to_string(&reason).unwrap();
            assert_eq!(format!("\"{reason}\""), json);
        }
    }

    #[test]
    fn failed_outcome_omits_empty_fields() {
        let outcome = SubmissionOutcome::failed(
            Uuid::new_v4(),
            FailureReason::InsufficientCredit,
            AnswerSet::new(),
        );
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["reason"], "insufficient_credit");
        assert!(json.get("suggestions").is_none());
        assert!(json.get("record_id").is_none());
        assert!(!outcome.is_completed());
    }
}
