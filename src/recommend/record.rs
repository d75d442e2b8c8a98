//! The durable artifact of one completed session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::quiz::AnswerSet;

/// A stored search: who asked, what they answered, what we suggested.
///
/// Created once and never updated; the store has no update operation for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRecord {
    pub id: Uuid,
    pub user_id: String,
    pub quiz_data: AnswerSet,
    pub results: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl SearchRecord {
    pub fn new(user_id: &str, quiz_data: AnswerSet, results: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            quiz_data,
            results,
            created_at: Utc::now(),
        }
    }
}
