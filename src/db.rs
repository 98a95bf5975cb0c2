//! Scoped database session management and the provisioning audit store.
//!
//! The pool is process-wide state: opened once via [`Db::connect`], schema
//! initialized additively via [`Db::init_schema`], disposed via
//! [`Db::close`]. Individual units of work check a [`Session`] out of the
//! pool; a session commits only when asked to and rolls back on every other
//! exit path, including error propagation and early return.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, Sqlite, SqliteConnection, SqlitePool, Transaction};
use std::str::FromStr;
use std::time::Duration;
use tracing::{instrument, warn};

use crate::config::DatabaseConfig;
use crate::model::{BatchReport, FailedWorker};

pub struct Db {
    pool: SqlitePool,
}

impl Db {
    /// Open the connection pool with the configured knobs. The configured
    /// persistent size plus the overflow allowance bound the number of
    /// simultaneously open connections; excess acquisitions queue until the
    /// acquire timeout elapses.
    pub async fn connect(cfg: &DatabaseConfig) -> Result<Self> {
        let url = normalize_database_url(&cfg.database_url);
        let options = SqliteConnectOptions::from_str(&url)
            .with_context(|| format!("invalid database URL: {url}"))?
            .create_if_missing(true)
            .statement_cache_capacity(cfg.statement_cache_size);

        let pool = SqlitePoolOptions::new()
            .max_connections(cfg.pool_size + cfg.max_overflow)
            .acquire_timeout(Duration::from_secs(cfg.pool_timeout_secs))
            .max_lifetime(Duration::from_secs(cfg.pool_recycle_secs))
            .idle_timeout(Duration::from_secs(cfg.idle_timeout_secs))
            .test_before_acquire(true)
            .connect_with(options)
            .await
            .context("failed to open database pool")?;

        Ok(Self { pool })
    }

    /// Create all audit tables if absent. Additive only.
    pub async fn init_schema(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("failed to run migrations")?;
        Ok(())
    }

    /// Check a transactional session out of the pool.
    pub async fn session(&self) -> Result<Session> {
        let tx = self
            .pool
            .begin()
            .await
            .context("failed to acquire database session")?;
        Ok(Session { tx })
    }

    /// Run `op` inside a scoped session: commit when it returns `Ok`, roll
    /// back and propagate the original error when it returns `Err`. Commit
    /// is never attempted after a failure.
    pub async fn with_session<T, F>(&self, op: F) -> Result<T>
    where
        F: for<'c> FnOnce(&'c mut SqliteConnection) -> BoxFuture<'c, Result<T>>,
    {
        let mut session = self.session().await?;
        let outcome = op(session.executor()).await;
        match outcome {
            Ok(value) => {
                session.commit().await?;
                Ok(value)
            }
            Err(err) => {
                session.rollback().await;
                Err(err)
            }
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Dispose the pool. No session may be acquired afterwards.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// One unit of work. Dropping the session without committing rolls the
/// transaction back when the connection returns to the pool.
pub struct Session {
    tx: Transaction<'static, Sqlite>,
}

impl Session {
    pub fn executor(&mut self) -> &mut SqliteConnection {
        &mut self.tx
    }

    pub async fn commit(self) -> Result<()> {
        self.tx.commit().await.context("failed to commit session")
    }

    pub async fn rollback(self) {
        if let Err(err) = self.tx.rollback().await {
            warn!(%err, "session rollback failed");
        }
    }
}

/// Normalize the configured database URL before engine construction.
/// Non-sqlite schemes and in-memory URLs pass through untouched; file-backed
/// sqlite URLs get a leading `~/` expanded and their parent directory
/// created so the pool can create the file itself.
pub fn normalize_database_url(url: &str) -> String {
    if !url.starts_with("sqlite:") || url.starts_with("sqlite::memory") {
        return url.to_string();
    }

    let rest = url["sqlite:".len()..].trim_start_matches("//");
    let (path, query) = match rest.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (rest, None),
    };
    if path.is_empty() {
        return url.to_string();
    }

    let expanded = match (path.strip_prefix("~/"), std::env::var("HOME")) {
        (Some(tail), Ok(home)) => format!("{}/{tail}", home.trim_end_matches('/')),
        _ => path.to_string(),
    };

    if let Some(parent) = std::path::Path::new(&expanded).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }

    match query {
        Some(query) => format!("sqlite://{expanded}?{query}"),
        None => format!("sqlite://{expanded}"),
    }
}

/// Record one batch report under a run id. Returns the row id so failures
/// can be attached to it.
#[instrument(skip_all)]
pub async fn record_batch(
    conn: &mut SqliteConnection,
    run_id: &str,
    report: &BatchReport,
    recorded_at: DateTime<Utc>,
) -> Result<i64> {
    let rec = sqlx::query(
        "INSERT INTO provision_batches (run_id, department, total, created, failed, recorded_at) \
         VALUES (?, ?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(run_id)
    .bind(&report.department)
    .bind(report.total as i64)
    .bind(report.created as i64)
    .bind(report.failed as i64)
    .bind(recorded_at)
    .fetch_one(&mut *conn)
    .await?;
    Ok(rec.get::<i64, _>("id"))
}

#[instrument(skip_all)]
pub async fn record_failures(
    conn: &mut SqliteConnection,
    batch_id: i64,
    failures: &[FailedWorker],
) -> Result<()> {
    for failure in failures {
        sqlx::query(
            "INSERT INTO provision_failures (batch_id, name, email, error) VALUES (?, ?, ?, ?)",
        )
        .bind(batch_id)
        .bind(&failure.name)
        .bind(&failure.email)
        .bind(&failure.error)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

pub async fn batch_count(conn: &mut SqliteConnection) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM provision_batches")
        .fetch_one(&mut *conn)
        .await?;
    Ok(count)
}

/// Per-department totals recorded for one run, in insertion order.
pub async fn run_batches(
    conn: &mut SqliteConnection,
    run_id: &str,
) -> Result<Vec<(String, i64, i64, i64)>> {
    let rows = sqlx::query_as::<_, (String, i64, i64, i64)>(
        "SELECT department, total, created, failed FROM provision_batches \
         WHERE run_id = ? ORDER BY id",
    )
    .bind(run_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}
