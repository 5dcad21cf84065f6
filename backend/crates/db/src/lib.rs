pub mod attachments;
pub mod sheet;
pub mod sync;
pub mod taxonomy;
pub mod tickets;
pub mod users;

use helpdesk_common::error::{HelpdeskError, HelpdeskResult};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

const SCHEMA: &str = include_str!("../../../migrations/0001_init.sql");

/// Create a Postgres connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> HelpdeskResult<PgPool> {
    tracing::info!("connecting to database");
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .map_err(|e| HelpdeskError::Database(e.to_string()))
}

/// Apply the idempotent schema (tables, indexes) statement by statement.
pub async fn ensure_schema(pool: &PgPool) -> HelpdeskResult<()> {
    for statement in SCHEMA.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| HelpdeskError::Database(e.to_string()))?;
    }
    tracing::info!("database schema ready");
    Ok(())
}

pub(crate) fn db_error(err: sqlx::Error) -> HelpdeskError {
    HelpdeskError::Database(err.to_string())
}

/// Translate constraint violations into client-facing errors.
pub(crate) fn write_error(err: sqlx::Error, what: &str) -> HelpdeskError {
    let msg = err.to_string();
    if msg.contains("duplicate key") || msg.contains("unique constraint") {
        HelpdeskError::Conflict(format!("{what} already exists"))
    } else if msg.contains("violates foreign key") {
        HelpdeskError::Validation(format!("{what} references a record that does not exist"))
    } else {
        HelpdeskError::Database(msg)
    }
}

#[cfg(any(test, feature = "testing"))]
pub mod test_support {
    use super::*;
    use tokio::sync::{Mutex, MutexGuard};

    // database tests share one schema and wipe tables, so they run one at a time
    static DB_LOCK: Mutex<()> = Mutex::const_new(());

    /// Pool against `TEST_DATABASE_URL` with the schema applied and all rows
    /// removed, or `None` when no test database is configured.
    pub async fn test_pool() -> Option<(PgPool, MutexGuard<'static, ()>)> {
        let url = std::env::var("TEST_DATABASE_URL").ok()?;
        let guard = DB_LOCK.lock().await;
        let pool = create_pool(&url).await.expect("db should connect");
        ensure_schema(&pool).await.expect("schema should apply");
        for table in ["attachments", "ticket_labels", "tickets", "labels", "categories"] {
            sqlx::query(&format!("delete from {table}"))
                .execute(&pool)
                .await
                .expect("table should clear");
        }
        Some((pool, guard))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_pool_fails_with_invalid_url() {
        let result = create_pool("postgres://invalid:5432/nonexistent").await;
        assert!(result.is_err());
    }

    #[test]
    fn schema_splits_into_statements() {
        let statements: Vec<&str> = SCHEMA
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        assert_eq!(statements.len(), 6);
        assert!(statements.iter().all(|s| s.starts_with("create")));
    }
}
