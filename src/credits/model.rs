//! Account and credit data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user account and its credit balance.
///
/// The balance stored here is the single source of truth; it is only changed
/// through the ledger's atomic debit and top-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub name: String,
    pub credits: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn new(id: impl Into<String>, name: impl Into<String>, credits: u32) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            credits,
            created_at: now,
            updated_at: now,
        }
    }
}

/// One journal row written by the store alongside every balance change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditEvent {
    pub user_id: String,
    /// Signed change: -1 for a debit, +n for a top-up or refund.
    pub delta: i64,
    pub balance_after: u32,
    pub created_at: DateTime<Utc>,
}

/// Broadcast to listeners after a balance change commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceChanged {
    pub user_id: String,
    pub balance: u32,
}
