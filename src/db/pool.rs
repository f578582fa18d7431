use crate::config::Config;
use crate::error::{DbError, Result, WeaveError};
use arc_swap::ArcSwap;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Shared connection pool (§4.8, §5).
///
/// Wrapped in an `ArcSwap` so a fatal connection error can swap in a freshly
/// created pool without taking a lock across the whole process — every
/// concurrent safe-fetch task holds only a cheap `Arc` snapshot.
pub struct ConnectionPool {
    inner: ArcSwap<SqlitePool>,
    config: Config,
}

impl ConnectionPool {
    pub async fn connect(config: &Config) -> Result<Self> {
        let pool = Self::build_pool(config).await?;
        schema::init_schema(&pool).await?;
        Ok(Self {
            inner: ArcSwap::from_pointee(pool),
            config: config.clone(),
        })
    }

    async fn build_pool(config: &Config) -> Result<SqlitePool> {
        let options = SqliteConnectOptions::from_str(&config.database_url)
            .map_err(|e| WeaveError::Database(DbError::Sqlx(e.to_string())))?
            .create_if_missing(true);

        SqlitePoolOptions::new()
            .max_connections(config.pool_max_connections)
            .idle_timeout(Duration::from_secs(config.pool_idle_timeout_secs))
            .acquire_timeout(Duration::from_secs(config.pool_connect_timeout_secs))
            .connect_with(options)
            .await
            .map_err(|e| WeaveError::Database(DbError::Sqlx(e.to_string())))
    }

    pub fn pool(&self) -> Arc<SqlitePool> {
        self.inner.load_full()
    }

    /// Tear down and lazily recreate the pool after a fatal connection error
    /// (§4.8). Callers treat this as best-effort: if recreation itself fails,
    /// the stale pool is left in place and the caller's operation still
    /// fails, but subsequent callers get another chance.
    pub async fn recreate(&self) -> Result<()> {
        let fresh = Self::build_pool(&self.config).await?;
        schema::init_schema(&fresh).await?;
        self.inner.store(Arc::new(fresh));
        Ok(())
    }

    /// BEGIN/COMMIT/ROLLBACK around a user callback, auto-released on all
    /// paths (§4.8).
    pub async fn with_transaction<F, Fut, T>(&self, f: F) -> Result<T>
    where
        F: for<'c> FnOnce(&'c mut Transaction<'static, Sqlite>) -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let pool = self.pool();
        let mut tx = pool
            .begin()
            .await
            .map_err(|e| WeaveError::Database(DbError::Sqlx(e.to_string())))?;

        match f(&mut tx).await {
            Ok(value) => {
                tx.commit()
                    .await
                    .map_err(|e| WeaveError::Database(DbError::Sqlx(e.to_string())))?;
                Ok(value)
            }
            Err(err) => {
                // best-effort rollback; the transaction drops and rolls back
                // regardless if this explicit rollback itself fails.
                let _ = tx.rollback().await;
                Err(err)
            }
        }
    }
}

use super::schema;

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_config() -> Config {
        Config {
            database_url: "sqlite::memory:".to_string(),
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn connect_initializes_schema() {
        let cfg = memory_config().await;
        let pool = ConnectionPool::connect(&cfg).await.unwrap();
        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'")
                .fetch_one(&*pool.pool())
                .await
                .unwrap();
        assert!(count.0 > 0);
    }

    #[tokio::test]
    async fn with_transaction_commits_on_success() {
        let cfg = memory_config().await;
        let pool = ConnectionPool::connect(&cfg).await.unwrap();
        let result = pool
            .with_transaction(|tx| {
                Box::pin(async move {
                    sqlx::query("INSERT INTO operator_logs (id, operation, details, duration_ms, success, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)")
                        .bind("log-1")
                        .bind("test_op")
                        .bind("{}")
                        .bind(10_i64)
                        .bind(true)
                        .bind("2026-01-01T00:00:00Z")
                        .execute(&mut **tx)
                        .await
                        .map_err(|e| crate::error::WeaveError::Database(crate::error::DbError::from(e)))?;
                    Ok(())
                })
            })
            .await;
        assert!(result.is_ok());

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM operator_logs")
            .fetch_one(&*pool.pool())
            .await
            .unwrap();
        assert_eq!(count.0, 1);
    }

    #[tokio::test]
    async fn with_transaction_rolls_back_on_failure() {
        let cfg = memory_config().await;
        let pool = ConnectionPool::connect(&cfg).await.unwrap();
        let result: Result<()> = pool
            .with_transaction(|tx| {
                Box::pin(async move {
                    sqlx::query("INSERT INTO operator_logs (id, operation, details, duration_ms, success, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)")
                        .bind("log-2")
                        .bind("test_op")
                        .bind("{}")
                        .bind(10_i64)
                        .bind(true)
                        .bind("2026-01-01T00:00:00Z")
                        .execute(&mut **tx)
                        .await
                        .map_err(|e| crate::error::WeaveError::Database(crate::error::DbError::from(e)))?;
                    Err(crate::error::WeaveError::SessionComplete(
                        crate::error::SessionCompleteError::Transaction("forced failure".into()),
                    ))
                })
            })
            .await;
        assert!(result.is_err());

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM operator_logs")
            .fetch_one(&*pool.pool())
            .await
            .unwrap();
        assert_eq!(count.0, 0);
    }
}
