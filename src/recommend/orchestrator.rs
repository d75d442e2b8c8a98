//! Recommendation orchestrator — drives a submitted session to its outcome.
//!
//! Steps run strictly in order: balance check, atomic debit, generation under
//! a timeout, persistence. Each step can end the submission; nothing is retried.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::config::{OrchestratorConfig, RefundPolicy};
use crate::credits::CreditLedger;
use crate::error::{LedgerError, ValidationError};
use crate::quiz::{AnswerSet, Catalog, QuizSession, SessionState};
use crate::store::SearchStore;

use super::generator::SuggestionGenerator;
use super::outcome::{FailureReason, SubmissionOutcome};
use super::prompt::build_prompt;
use super::record::SearchRecord;

pub struct RecommendationOrchestrator {
    ledger: Arc<CreditLedger>,
    generator: Arc<dyn SuggestionGenerator>,
    searches: Arc<dyn SearchStore>,
    catalog: Arc<Catalog>,
    config: OrchestratorConfig,
}

impl RecommendationOrchestrator {
    pub fn new(
        ledger: Arc<CreditLedger>,
        generator: Arc<dyn SuggestionGenerator>,
        searches: Arc<dyn SearchStore>,
        catalog: Arc<Catalog>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            ledger,
            generator,
            searches,
            catalog,
            config,
        }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn ledger(&self) -> &Arc<CreditLedger> {
        &self.ledger
    }

    /// Validate a complete answer set and submit it in one call.
    pub async fn submit_answers(
        &self,
        user_id: &str,
        answers: &AnswerSet,
    ) -> Result<SubmissionOutcome, ValidationError> {
        let mut session = QuizSession::from_answers(Arc::clone(&self.catalog), answers)?;
        self.submit(user_id, &mut session).await
    }

    /// Run a session in `Submitting` to `Completed` or `Failed`.
    ///
    /// Any other state is rejected before the ledger is touched. Failures
    /// after validation are reported in the outcome, not as errors.
    pub async fn submit(
        &self,
        user_id: &str,
        session: &mut QuizSession,
    ) -> Result<SubmissionOutcome, ValidationError> {
        if session.state() != SessionState::Submitting {
            return Err(ValidationError::NotReady {
                state: session.state().to_string(),
            });
        }
        let session_id = session.id();
        let answers = session.answers().clone();
        info!(%session_id, user_id, "Submission started");

        // 1. Precondition: at least one credit.
        match self.ledger.balance(user_id).await {
            Ok(balance) if balance >= 1 => {}
            Ok(balance) => {
                info!(%session_id, user_id, balance, "Submission refused: no credit");
                return Ok(fail(session, FailureReason::InsufficientCredit, answers)
                    .with_balance(balance));
            }
            Err(LedgerError::UnknownAccount(_)) => {
                warn!(%session_id, user_id, "Submission refused: unknown account");
                return Ok(fail(session, FailureReason::InsufficientCredit, answers));
            }
            Err(e) => {
                error!(%session_id, user_id, error = %e, "Balance unavailable");
                return Ok(fail(session, FailureReason::LedgerUnavailable, answers));
            }
        }

        // 2. Atomic debit. Losing a race to another session lands here.
        let balance = match self.ledger.debit(user_id).await {
            Ok(balance) => balance,
            Err(LedgerError::InsufficientCredit { balance, .. }) => {
                info!(%session_id, user_id, "Debit lost to a concurrent submission");
                return Ok(fail(session, FailureReason::InsufficientCredit, answers)
                    .with_balance(balance));
            }
            Err(LedgerError::UnknownAccount(_)) => {
                return Ok(fail(session, FailureReason::InsufficientCredit, answers));
            }
            Err(e) => {
                error!(%session_id, user_id, error = %e, "Debit failed");
                return Ok(fail(session, FailureReason::LedgerUnavailable, answers));
            }
        };

        // 3. Generation, bounded.
        let prompt = build_prompt(
            &self.catalog,
            &answers,
            self.config.min_suggestions,
            self.config.max_suggestions,
        );
        let generated =
            tokio::time::timeout(self.config.generation_timeout, self.generator.generate(&prompt))
                .await;

        // 4. Any generation fault ends the submission.
        let mut suggestions = match generated {
            Ok(Ok(suggestions)) if !suggestions.is_empty() => suggestions,
            Ok(Ok(_)) => {
                warn!(%session_id, "Generator returned no suggestions");
                return Ok(self.generation_failed(user_id, session, answers, balance).await);
            }
            Ok(Err(e)) => {
                warn!(%session_id, error = %e, "Generation failed");
                return Ok(self.generation_failed(user_id, session, answers, balance).await);
            }
            Err(_) => {
                warn!(
                    %session_id,
                    timeout_secs = self.config.generation_timeout.as_secs(),
                    "Generation timed out"
                );
                return Ok(self.generation_failed(user_id, session, answers, balance).await);
            }
        };
        if suggestions.len() < self.config.min_suggestions {
            warn!(%session_id, count = suggestions.len(), "Fewer suggestions than requested");
        }
        suggestions.truncate(self.config.max_suggestions);

        // 5. Persist.
        let record = SearchRecord::new(user_id, answers.clone(), suggestions.clone());
        if let Err(e) = self.searches.insert_search(&record).await {
            // 6. The credit stays spent: the user still gets the suggestions.
            error!(%session_id, user_id, error = %e, "Failed to persist search");
            return Ok(fail(session, FailureReason::PersistFailed, answers)
                .with_balance(balance)
                .with_suggestions(suggestions));
        }

        // 7. Done.
        session.complete();
        info!(
            %session_id,
            user_id,
            record_id = %record.id,
            count = suggestions.len(),
            balance,
            "Submission completed"
        );
        Ok(SubmissionOutcome::completed(
            session_id,
            answers,
            suggestions,
            balance,
            record.id,
        ))
    }

    async fn generation_failed(
        &self,
        user_id: &str,
        session: &mut QuizSession,
        answers: AnswerSet,
        balance: u32,
    ) -> SubmissionOutcome {
        let balance = match self.config.refund_policy {
            RefundPolicy::Keep => balance,
            RefundPolicy::RefundOnGenerationFailure => match self.ledger.credit(user_id, 1).await {
                Ok(refunded) => {
                    info!(user_id, balance = refunded, "Credit refunded after generation failure");
                    refunded
                }
                Err(e) => {
                    error!(user_id, error = %e, "Refund failed");
                    balance
                }
            },
        };
        fail(session, FailureReason::GenerationFailed, answers).with_balance(balance)
    }
}

fn fail(session: &mut QuizSession, reason: FailureReason, answers: AnswerSet) -> SubmissionOutcome {
    session.fail(reason);
    info!(session_id = %session.id(), %reason, "Submission failed");
    SubmissionOutcome::failed(session.id(), reason, answers)
}
