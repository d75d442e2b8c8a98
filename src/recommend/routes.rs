//! REST endpoints for the quiz, profiles and credits.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tracing::{error, info};

use crate::error::{DatabaseError, LedgerError};
use crate::quiz::AnswerSet;
use crate::store::SearchStore;

use super::orchestrator::RecommendationOrchestrator;

/// Shared state for quiz routes.
#[derive(Clone)]
pub struct QuizRouteState {
    pub orchestrator: Arc<RecommendationOrchestrator>,
    pub searches: Arc<dyn SearchStore>,
    /// Credits granted to profiles created through the API.
    pub initial_credits: u32,
}

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub user_id: String,
    pub answers: AnswerSet,
}

#[derive(Debug, Deserialize)]
pub struct CreateProfileRequest {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct AddCreditsRequest {
    pub amount: u32,
}

fn error_response(status: StatusCode, message: impl std::fmt::Display) -> Response {
    (status, Json(serde_json::json!({"error": message.to_string()}))).into_response()
}

fn ledger_error_response(e: LedgerError) -> Response {
    match e {
        LedgerError::UnknownAccount(_) => error_response(StatusCode::NOT_FOUND, e),
        LedgerError::InvalidAmount(_) => error_response(StatusCode::BAD_REQUEST, e),
        LedgerError::InsufficientCredit { .. } => error_response(StatusCode::PAYMENT_REQUIRED, e),
        LedgerError::Database(DatabaseError::Constraint(_)) => {
            error_response(StatusCode::CONFLICT, e)
        }
        LedgerError::Database(_) => {
            error!(error = %e, "Ledger store error");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e)
        }
    }
}

/// GET /api/quiz/questions
///
/// The questionnaire in traversal order.
async fn get_questions(State(state): State<QuizRouteState>) -> impl IntoResponse {
    Json(serde_json::to_value(&**state.orchestrator.catalog()).unwrap_or_default())
}

/// POST /api/quiz/submit
///
/// Validates the answers and runs the submission. Business failures come back
/// as a `failed` outcome with status 200; invalid answers are 422.
async fn submit_quiz(
    State(state): State<QuizRouteState>,
    Json(req): Json<SubmitRequest>,
) -> Response {
    match state
        .orchestrator
        .submit_answers(&req.user_id, &req.answers)
        .await
    {
        Ok(outcome) => Json(outcome).into_response(),
        Err(e) => {
            info!(user_id = %req.user_id, error = %e, "Rejected quiz submission");
            error_response(StatusCode::UNPROCESSABLE_ENTITY, e)
        }
    }
}

/// POST /api/profiles
async fn create_profile(
    State(state): State<QuizRouteState>,
    Json(req): Json<CreateProfileRequest>,
) -> Response {
    let id = req
        .id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    match state
        .orchestrator
        .ledger()
        .open_account(&id, &req.name, state.initial_credits)
        .await
    {
        Ok(profile) => (StatusCode::CREATED, Json(profile)).into_response(),
        Err(e) => ledger_error_response(e),
    }
}

/// GET /api/profiles/{id}
async fn get_profile(State(state): State<QuizRouteState>, Path(id): Path<String>) -> Response {
    match state.orchestrator.ledger().profile(&id).await {
        Ok(profile) => Json(profile).into_response(),
        Err(e) => ledger_error_response(e),
    }
}

/// POST /api/profiles/{id}/credits
///
/// Simulated purchase: adds `amount` credits and returns the new balance.
async fn add_credits(
    State(state): State<QuizRouteState>,
    Path(id): Path<String>,
    Json(req): Json<AddCreditsRequest>,
) -> Response {
    match state.orchestrator.ledger().credit(&id, req.amount).await {
        Ok(balance) => Json(serde_json::json!({"user_id": id, "balance": balance})).into_response(),
        Err(e) => ledger_error_response(e),
    }
}

/// GET /api/profiles/{id}/searches
///
/// Search history, newest first.
async fn list_searches(State(state): State<QuizRouteState>, Path(id): Path<String>) -> Response {
    match state.searches.list_searches(&id).await {
        Ok(records) => Json(records).into_response(),
        Err(e) => {
            error!(user_id = %id, error = %e, "Failed to list searches");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e)
        }
    }
}

/// Build the quiz and profile REST routes.
pub fn quiz_routes(state: QuizRouteState) -> Router {
    Router::new()
        .route("/api/quiz/questions", get(get_questions))
        .route("/api/quiz/submit", post(submit_quiz))
        .route("/api/profiles", post(create_profile))
        .route("/api/profiles/{id}", get(get_profile))
        .route("/api/profiles/{id}/credits", post(add_credits))
        .route("/api/profiles/{id}/searches", get(list_searches))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;
    use crate::config::OrchestratorConfig;
    use crate::credits::CreditLedger;
    use crate::error::LlmError;
    use crate::quiz::Catalog;
    use crate::recommend::SuggestionGenerator;
    use crate::store::LibSqlBackend;

    struct FixedGenerator;

    #[async_trait]
    impl SuggestionGenerator for FixedGenerator {
        async fn generate(&self, _prompt: &str) -> Result<Vec<String>, LlmError> {
            Ok((1..=5).map(|i| format!("Idea {i}")).collect())
        }
    }

    async fn test_router() -> Router {
        let db = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        let ledger = Arc::new(CreditLedger::new(db.clone()));
        ledger.open_account("alice", "Alice", 2).await.unwrap();
        let orchestrator = Arc::new(RecommendationOrchestrator::new(
            ledger,
            Arc::new(FixedGenerator),
            db.clone(),
            Catalog::gift_quiz(),
            OrchestratorConfig::default(),
        ));
        quiz_routes(QuizRouteState {
            orchestrator,
            searches: db,
            initial_credits: 1,
        })
    }

    async fn send(router: Router, method: &str, uri: &str, body: Option<serde_json::Value>) -> (StatusCode, serde_json::Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn questions_listed_in_order() {
        let (status, json) = send(test_router().await, "GET", "/api/quiz/questions", None).await;
        assert_eq!(status, StatusCode::OK);
        let questions = json.as_array().unwrap();
        assert_eq!(questions.len(), 10);
        assert_eq!(questions[0]["id"], "age");
        assert_eq!(questions[3]["kind"]["type"], "multi_choice");
    }

    #[tokio::test]
    async fn incomplete_submission_is_422() {
        let body = serde_json::json!({"user_id": "alice", "answers": {"age": "18-25"}});
        let (status, json) = send(test_router().await, "POST", "/api/quiz/submit", Some(body)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(json["error"].is_string());
    }

    #[tokio::test]
    async fn unknown_profile_is_404() {
        let (status, _) = send(test_router().await, "GET", "/api/profiles/ghost", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn zero_credit_purchase_is_400() {
        let body = serde_json::json!({"amount": 0});
        let (status, _) = send(test_router().await, "POST", "/api/profiles/alice/credits", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn overflowing_purchase_is_400() {
        let body = serde_json::json!({"amount": u32::MAX});
        let (status, json) = send(test_router().await, "POST", "/api/profiles/alice/credits", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].is_string());
    }

    #[tokio::test]
    async fn purchase_returns_new_balance() {
        let body = serde_json::json!({"amount": 5});
        let (status, json) = send(test_router().await, "POST", "/api/profiles/alice/credits", Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["balance"], 7);
    }

    #[tokio::test]
    async fn duplicate_profile_is_409() {
        let body = serde_json::json!({"id": "alice", "name": "Again"});
        let (status, _) = send(test_router().await, "POST", "/api/profiles", Some(body)).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn created_profile_gets_initial_credits() {
        let body = serde_json::json!({"name": "Bob"});
        let (status, json) = send(test_router().await, "POST", "/api/profiles", Some(body)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["credits"], 1);
        assert!(!json["id"].as_str().unwrap().is_empty());
    }
}
