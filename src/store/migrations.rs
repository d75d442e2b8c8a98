//! Version-tracked database migrations for the libSQL backend.
//!
//! Each migration has a version number and SQL. `run_migrations()` checks
//! the current version and applies only the new ones sequentially.

use libsql::Connection;

use crate::error::DatabaseError;

/// A single migration step.
struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

/// All migrations in order. Add new versions to the end.
static MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "profiles_and_searches",
        sql: r#"
            CREATE TABLE IF NOT EXISTS profiles (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                credits INTEGER NOT NULL DEFAULT 0 CHECK (credits >= 0 AND credits <= 4294967295),
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS searches (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL REFERENCES profiles(id),
                quiz_data TEXT NOT NULL,
                results TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_searches_user ON searches(user_id, created_at);
        "#,
    },
    Migration {
        version: 2,
        name: "credit_journal",
        sql: r#"
            CREATE TABLE IF NOT EXISTS credit_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                delta INTEGER NOT NULL,
                balance_after INTEGER NOT NULL,
                created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );
            CREATE INDEX IF NOT EXISTS idx_credit_events_user ON credit_events(user_id);

            CREATE TRIGGER IF NOT EXISTS trg_profiles_credit_insert
            AFTER INSERT ON profiles
            WHEN NEW.credits > 0
            BEGIN
                INSERT INTO credit_events (user_id, delta, balance_after)
                VALUES (NEW.id, NEW.credits, NEW.credits);
            END;

            CREATE TRIGGER IF NOT EXISTS trg_profiles_credit_update
            AFTER UPDATE OF credits ON profiles
            WHEN NEW.credits <> OLD.credits
            BEGIN
                INSERT INTO credit_events (user_id, delta, balance_after)
                VALUES (NEW.id, NEW.credits - OLD.credits, NEW.credits);
            END;
        "#,
    },
];

/// Create the tracking table and apply every migration newer than the
/// recorded version.
pub async fn run_migrations(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        (),
    )
    .await
    .map_err(|e| DatabaseError::Migration(format!("Failed to create _migrations table: {e}")))?;

    let current_version = get_current_version(conn).await?;

    for migration in MIGRATIONS {
        if migration.version > current_version {
            tracing::info!(
                version = migration.version,
                name = migration.name,
                "Applying migration"
            );
            conn.execute_batch(migration.sql).await.map_err(|e| {
                DatabaseError::Migration(format!(
                    "Migration V{} ({}) failed: {e}",
                    migration.version, migration.name
                ))
            })?;
            seed_version(conn, migration.version, migration.name).await?;
        }
    }

    tracing::info!(
        "Database migrations complete (at V{})",
        MIGRATIONS.last().map_or(0, |m| m.version)
    );
    Ok(())
}

async fn get_current_version(conn: &Connection) -> Result<i64, DatabaseError> {
    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM _migrations", ())
        .await
        .map_err(|e| DatabaseError::Migration(format!("Failed to read migration version: {e}")))?;

    match rows.next().await {
        Ok(Some(row)) => Ok(row.get::<i64>(0).unwrap_or(0)),
        Ok(None) => Ok(0),
        Err(e) => Err(DatabaseError::Migration(format!(
            "Failed to read migration version: {e}"
        ))),
    }
}

async fn seed_version(conn: &Connection, version: i64, name: &str) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT OR IGNORE INTO _migrations (version, name) VALUES (?1, ?2)",
        libsql::params![version, name],
    )
    .await
    .map_err(|e| DatabaseError::Migration(format!("Failed to record migration V{version}: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_conn() -> Connection {
        let db = libsql::Builder::new_local(":memory:").build().await.unwrap();
        db.connect().unwrap()
    }

    async fn table_exists(conn: &Connection, kind: &str, name: &str) -> bool {
        let mut rows = conn
            .query(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = ?1 AND name = ?2",
                libsql::params![kind, name],
            )
            .await
            .unwrap();
        let row = rows.next().await.unwrap().unwrap();
        row.get::<i64>(0).unwrap() == 1
    }

    #[tokio::test]
    async fn creates_all_tables_and_triggers() {
        let conn = memory_conn().await;
        run_migrations(&conn).await.unwrap();

        for table in ["profiles", "searches", "credit_events", "_migrations"] {
            assert!(table_exists(&conn, "table", table).await, "{table} missing");
        }
        for trigger in ["trg_profiles_credit_insert", "trg_profiles_credit_update"] {
            assert!(table_exists(&conn, "trigger", trigger).await, "{trigger} missing");
        }
        assert_eq!(get_current_version(&conn).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let conn = memory_conn().await;
        run_migrations(&conn).await.unwrap();
        run_migrations(&conn).await.unwrap();
        assert_eq!(get_current_version(&conn).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn negative_balance_rejected_by_schema() {
        let conn = memory_conn().await;
        run_migrations(&conn).await.unwrap();
        conn.execute(
            "INSERT INTO profiles (id, name, credits, created_at, updated_at) VALUES ('u', 'U', 0, 'x', 'x')",
            (),
        )
        .await
        .unwrap();
        let result = conn
            .execute("UPDATE profiles SET credits = credits - 1 WHERE id = 'u'", ())
            .await;
        assert!(result.is_err());
    }
}
