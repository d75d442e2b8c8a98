//! Store traits — the account and search collaborators the core depends on.

use async_trait::async_trait;

use crate::credits::{CreditEvent, Profile};
use crate::error::DatabaseError;
use crate::recommend::SearchRecord;

/// Owns the canonical credit balance of every profile.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Insert a new profile. Fails with `Constraint` if the id is taken.
    async fn create_profile(&self, profile: &Profile) -> Result<(), DatabaseError>;

    /// Get a profile by id.
    async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>, DatabaseError>;

    /// Current balance, or `None` for an unknown profile.
    async fn get_balance(&self, user_id: &str) -> Result<Option<u32>, DatabaseError>;

    /// Take one credit in a single conditional update.
    ///
    /// Returns the new balance, or `None` when nothing was debited (balance
    /// already zero, or no such profile).
    async fn debit_credit(&self, user_id: &str) -> Result<Option<u32>, DatabaseError>;

    /// Add `amount` credits in a single update. Returns the new balance, or
    /// `None` for an unknown profile or when the balance would pass `u32::MAX`.
    async fn add_credits(&self, user_id: &str, amount: u32) -> Result<Option<u32>, DatabaseError>;

    /// Journal of balance changes for a profile, oldest first.
    async fn list_credit_events(&self, user_id: &str) -> Result<Vec<CreditEvent>, DatabaseError>;
}

/// Durable storage for completed searches. Insert-only.
#[async_trait]
pub trait SearchStore: Send + Sync {
    /// Store a new search record.
    async fn insert_search(&self, record: &SearchRecord) -> Result<(), DatabaseError>;

    /// Searches of a user, most recent first.
    async fn list_searches(&self, user_id: &str) -> Result<Vec<SearchRecord>, DatabaseError>;
}

/// A full backend implementing every store.
#[async_trait]
pub trait Database: ProfileStore + SearchStore {
    /// Run all pending schema migrations.
    async fn run_migrations(&self) -> Result<(), DatabaseError>;
}
