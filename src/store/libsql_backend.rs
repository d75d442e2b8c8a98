//! libSQL backend — async store trait implementations.
//!
//! Supports local file and in-memory databases. Every balance change is a
//! single SQL statement, so concurrent debits are serialized by SQLite itself.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};

use crate::credits::{CreditEvent, Profile};
use crate::error::DatabaseError;
use crate::quiz::{AnswerSet, Catalog};
use crate::recommend::SearchRecord;
use crate::store::migrations;
use crate::store::traits::{Database, ProfileStore, SearchStore};

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
    /// Questionnaire used to re-tag stored answers on read.
    catalog: Arc<Catalog>,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
            catalog: Catalog::gift_quiz(),
        };
        backend.run_migrations().await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
            catalog: Catalog::gift_quiz(),
        };
        backend.run_migrations().await?;
        Ok(backend)
    }

    /// Get the connection.
    fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Run a statement expected to return at most one integer, draining the
    /// rows so the statement finishes before we return.
    async fn query_single_i64(
        &self,
        op: &str,
        sql: &str,
        params: impl libsql::params::IntoParams,
    ) -> Result<Option<i64>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(sql, params)
            .await
            .map_err(|e| DatabaseError::Query(format!("{op}: {e}")))?;

        let mut value = None;
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("{op}: {e}")))?
        {
            if value.is_none() {
                value = Some(
                    row.get::<i64>(0)
                        .map_err(|e| DatabaseError::Query(format!("{op} row parse: {e}")))?,
                );
            }
        }
        Ok(value)
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Fixed-width RFC 3339 so stored timestamps sort lexicographically.
/// Nanosecond precision keeps a read-back `DateTime` equal to the written one.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    // Try RFC 3339 first (our canonical write format)
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    // Try SQLite datetime() output with fractional seconds
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return ndt.and_utc();
    }
    // Try SQLite datetime() output without fractional seconds
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

/// Balances are stored as INTEGER checked to the `u32` range.
fn to_balance(value: i64) -> Result<u32, DatabaseError> {
    u32::try_from(value)
        .map_err(|_| DatabaseError::Serialization(format!("credit balance out of range: {value}")))
}

/// Map a libsql Row to a Profile.
///
/// Column order matches PROFILE_COLUMNS:
/// 0:id, 1:name, 2:credits, 3:created_at, 4:updated_at
fn row_to_profile(row: &libsql::Row) -> Result<Profile, DatabaseError> {
    let parse = |e: libsql::Error| DatabaseError::Query(format!("profile row parse: {e}"));
    let created: String = row.get(3).map_err(parse)?;
    let updated: String = row.get(4).map_err(parse)?;
    Ok(Profile {
        id: row.get(0).map_err(parse)?,
        name: row.get(1).map_err(parse)?,
        credits: to_balance(row.get(2).map_err(parse)?)?,
        created_at: parse_datetime(&created),
        updated_at: parse_datetime(&updated),
    })
}

/// Map a libsql Row to a SearchRecord.
///
/// Column order matches SEARCH_COLUMNS:
/// 0:id, 1:user_id, 2:quiz_data, 3:results, 4:created_at
fn row_to_search(row: &libsql::Row, catalog: &Catalog) -> Result<SearchRecord, DatabaseError> {
    let parse = |e: libsql::Error| DatabaseError::Query(format!("search row parse: {e}"));
    let id_str: String = row.get(0).map_err(parse)?;
    let quiz_str: String = row.get(2).map_err(parse)?;
    let results_str: String = row.get(3).map_err(parse)?;
    let created_str: String = row.get(4).map_err(parse)?;

    let id = id_str
        .parse()
        .map_err(|e| DatabaseError::Serialization(format!("search id {id_str}: {e}")))?;
    let mut quiz_data: AnswerSet = serde_json::from_str(&quiz_str)
        .map_err(|e| DatabaseError::Serialization(format!("quiz_data: {e}")))?;
    quiz_data.conform_to(catalog);
    let results: Vec<String> = serde_json::from_str(&results_str)
        .map_err(|e| DatabaseError::Serialization(format!("results: {e}")))?;

    Ok(SearchRecord {
        id,
        user_id: row.get(1).map_err(parse)?,
        quiz_data,
        results,
        created_at: parse_datetime(&created_str),
    })
}

// ── Trait implementations ───────────────────────────────────────────

const PROFILE_COLUMNS: &str = "id, name, credits, created_at, updated_at";

const SEARCH_COLUMNS: &str = "id, user_id, quiz_data, results, created_at";

#[async_trait]
impl Database for LibSqlBackend {
    async fn run_migrations(&self) -> Result<(), DatabaseError> {
        migrations::run_migrations(self.conn()).await
    }
}

#[async_trait]
impl ProfileStore for LibSqlBackend {
    async fn create_profile(&self, profile: &Profile) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                &format!("INSERT INTO profiles ({PROFILE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5)"),
                params![
                    profile.id.as_str(),
                    profile.name.as_str(),
                    i64::from(profile.credits),
                    format_datetime(&profile.created_at),
                    format_datetime(&profile.updated_at),
                ],
            )
            .await
            .map_err(|e| {
                let msg = e.to_string();
                if msg.contains("UNIQUE") {
                    DatabaseError::Constraint(format!("profile {} already exists", profile.id))
                } else {
                    DatabaseError::Query(format!("create_profile: {msg}"))
                }
            })?;

        debug!(user_id = %profile.id, credits = profile.credits, "Profile created");
        Ok(())
    }

    async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = ?1"),
                params![user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_profile: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_profile(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_profile: {e}"))),
        }
    }

    async fn get_balance(&self, user_id: &str) -> Result<Option<u32>, DatabaseError> {
        let credits = self
            .query_single_i64(
                "get_balance",
                "SELECT credits FROM profiles WHERE id = ?1",
                params![user_id],
            )
            .await?;
        credits.map(to_balance).transpose()
    }

    async fn debit_credit(&self, user_id: &str) -> Result<Option<u32>, DatabaseError> {
        let now = format_datetime(&Utc::now());
        let credits = self
            .query_single_i64(
                "debit_credit",
                "UPDATE profiles SET credits = credits - 1, updated_at = ?2
                 WHERE id = ?1 AND credits >= 1
                 RETURNING credits",
                params![user_id, now],
            )
            .await?;

        debug!(user_id, debited = credits.is_some(), "Debit attempted");
        credits.map(to_balance).transpose()
    }

    async fn add_credits(&self, user_id: &str, amount: u32) -> Result<Option<u32>, DatabaseError> {
        let now = format_datetime(&Utc::now());
        let credits = self
            .query_single_i64(
                "add_credits",
                "UPDATE profiles SET credits = credits + ?2, updated_at = ?3
                 WHERE id = ?1 AND credits + ?2 <= 4294967295
                 RETURNING credits",
                params![user_id, i64::from(amount), now],
            )
            .await?;

        debug!(user_id, amount, applied = credits.is_some(), "Credit attempted");
        credits.map(to_balance).transpose()
    }

    async fn list_credit_events(&self, user_id: &str) -> Result<Vec<CreditEvent>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT user_id, delta, balance_after, created_at FROM credit_events
                 WHERE user_id = ?1 ORDER BY id ASC",
                params![user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_credit_events: {e}")))?;

        let mut events = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("list_credit_events: {e}")))?
        {
            let parse = |e: libsql::Error| DatabaseError::Query(format!("credit event row parse: {e}"));
            let created: String = row.get(3).map_err(parse)?;
            events.push(CreditEvent {
                user_id: row.get(0).map_err(parse)?,
                delta: row.get(1).map_err(parse)?,
                balance_after: to_balance(row.get(2).map_err(parse)?)?,
                created_at: parse_datetime(&created),
            });
        }
        Ok(events)
    }
}

#[async_trait]
impl SearchStore for LibSqlBackend {
    async fn insert_search(&self, record: &SearchRecord) -> Result<(), DatabaseError> {
        let quiz_json = serde_json::to_string(&record.quiz_data)
            .map_err(|e| DatabaseError::Serialization(e.to_string()))?;
        let results_json = serde_json::to_string(&record.results)
            .map_err(|e| DatabaseError::Serialization(e.to_string()))?;

        self.conn()
            .execute(
                &format!("INSERT INTO searches ({SEARCH_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5)"),
                params![
                    record.id.to_string(),
                    record.user_id.as_str(),
                    quiz_json,
                    results_json,
                    format_datetime(&record.created_at),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("insert_search: {e}")))?;

        debug!(search_id = %record.id, user_id = %record.user_id, "Search stored");
        Ok(())
    }

    async fn list_searches(&self, user_id: &str) -> Result<Vec<SearchRecord>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {SEARCH_COLUMNS} FROM searches WHERE user_id = ?1
                     ORDER BY created_at DESC, rowid DESC"
                ),
                params![user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_searches: {e}")))?;

        let mut records = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("list_searches: {e}")))?
        {
            records.push(row_to_search(&row, &self.catalog)?);
        }
        Ok(records)
    }
}
