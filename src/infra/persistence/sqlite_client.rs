// SQLite access shared by every store.
//
// All statements run inside `SqliteClient::transaction`: the unit of work is begun,
// run and committed as a whole, and when it fails with a retryable error it is rolled
// back and the WHOLE unit runs again on a fresh transaction. Stores never see a
// half-applied operation and never write their own retry loops.

use crate::core::storage::{FailureClass, RetryDecision, RetryPolicy, RetryState, StorageError};
use sqlx::query::Query;
use sqlx::sqlite::{
    SqliteArguments, SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow,
};
use sqlx::{Sqlite, SqliteConnection, SqlitePool};
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::time::Duration;

/// A bind parameter. Kept owned so a unit of work can be re-run after a rollback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    Int(i64),
    Text(String),
    Null,
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Int(value)
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

fn bind_all<'q>(sql: &'q str, params: &'q [SqlValue]) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    params
        .iter()
        .fold(sqlx::query(sql), |query, value| match value {
            SqlValue::Int(i) => query.bind(*i),
            SqlValue::Text(s) => query.bind(s.as_str()),
            SqlValue::Null => query.bind(None::<i64>),
        })
}

/// Future returned by one attempt of a unit of work.
pub type TxFuture<'t, T> = Pin<Box<dyn Future<Output = Result<T, sqlx::Error>> + Send + 't>>;

/// The open transaction, as seen by a unit of work.
pub struct TxHandle<'t> {
    conn: &'t mut SqliteConnection,
}

impl<'t> TxHandle<'t> {
    /// Returns the number of affected rows.
    pub async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<u64, sqlx::Error> {
        let result = bind_all(sql, params).execute(&mut *self.conn).await?;
        Ok(result.rows_affected())
    }

    pub async fn fetch_optional(
        &mut self,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<Option<SqliteRow>, sqlx::Error> {
        bind_all(sql, params).fetch_optional(&mut *self.conn).await
    }


    pub async fn fetch_all(
        &mut self,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<Vec<SqliteRow>, sqlx::Error> {
        bind_all(sql, params).fetch_all(&mut *self.conn).await
    }
}

/// Decides which driver errors are worth another attempt.
pub type Classifier = fn(&sqlx::Error) -> FailureClass;

/// SQLITE_BUSY and SQLITE_LOCKED (and their extended codes) signal a concurrent writer;
/// 40001 is the SQL-standard serialization failure.
pub fn classify_sqlx_error(err: &sqlx::Error) -> FailureClass {
    match err {
        sqlx::Error::Database(db) => {
            let Some(code) = db.code() else {
                return FailureClass::Fatal;
            };
            if code == "40001" {
                return FailureClass::TransientConflict;
            }
            match code.parse::<i32>() {
                Ok(code) if matches!(code & 0xff, 5 | 6) => FailureClass::TransientConflict,
                _ => FailureClass::Fatal,
            }
        }
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::WorkerCrashed => FailureClass::Connection,
        _ => FailureClass::Fatal,
    }
}

#[derive(Clone)]
pub struct SqliteClient {
    pool: SqlitePool,
    policy: RetryPolicy,
    classify: Classifier,
}

impl SqliteClient {
    pub fn new(pool: SqlitePool, policy: RetryPolicy) -> Self {
        Self {
            pool,
            policy,
            classify: classify_sqlx_error,
        }
    }

    /// Open (creating if needed) the database file at `path`.
    pub async fn connect(
        path: &Path,
        max_connections: u32,
        policy: RetryPolicy,
    ) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                StorageError::Unavailable(format!("cannot create {}: {e}", parent.display()))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;

        tracing::info!(path = %path.display(), max_connections, "Opened SQLite database");
        Ok(Self::new(pool, policy))
    }

    /// Swap the retry predicate.
    #[allow(dead_code)] // Production always uses classify_sqlx_error
    pub fn with_classifier(mut self, classify: Classifier) -> Self {
        self.classify = classify;
        self
    }

    /// Run `work` as one transaction, retrying the whole unit on transient failures.
    ///
    /// `work` may be called several times, so it must rebuild any owned data it moves
    /// into the returned future.
    pub async fn transaction<T, F>(&self, label: &'static str, mut work: F) -> Result<T, StorageError>
    where
        T: Send,
        F: for<'t> FnMut(TxHandle<'t>) -> TxFuture<'t, T> + Send,
    {
        let mut retry = RetryState::new(self.policy);

        loop {
            let err = match self.attempt(&mut work).await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            let class = (self.classify)(&err);
            match retry.record_failure(class) {
                RetryDecision::Retry => {
                    tracing::warn!(
                        operation = label,
                        attempt = retry.attempts(),
                        class = ?class,
                        error = %err,
                        "Storage operation failed, retrying"
                    );
                }
                RetryDecision::GiveUp => {
                    tracing::error!(
                        operation = label,
                        attempts = retry.attempts(),
                        class = ?class,
                        error = %err,
                        "Storage operation failed"
                    );
                    return Err(match class {
                        FailureClass::TransientConflict => StorageError::TransientConflict {
                            attempts: retry.attempts(),
                            message: err.to_string(),
                        },
                        FailureClass::Connection => StorageError::Unavailable(err.to_string()),
                        FailureClass::Fatal => StorageError::Query(err.to_string()),
                    });
                }
            }
        }
    }

    async fn attempt<T, F>(&self, work: &mut F) -> Result<T, sqlx::Error>
    where
        F: for<'t> FnMut(TxHandle<'t>) -> TxFuture<'t, T>,
    {
        let mut tx = self.pool.begin().await?;

        match work(TxHandle { conn: &mut *tx }).await {
            Ok(value) => {
                tx.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!(error = %rollback_err, "Rollback failed");
                }
                Err(err)
            }
        }
    }

    /// Single statement in its own transaction. Returns the affected row count.
    pub async fn execute(
        &self,
        label: &'static str,
        sql: &'static str,
        params: Vec<SqlValue>,
    ) -> Result<u64, StorageError> {
        self.transaction(label, move |mut tx| {
            let params = params.clone();
            Box::pin(async move { tx.execute(sql, &params).await })
        })
        .await
    }

    pub async fn fetch_optional(
        &self,
        label: &'static str,
        sql: &'static str,
        params: Vec<SqlValue>,
    ) -> Result<Option<SqliteRow>, StorageError> {
        self.transaction(label, move |mut tx| {
            let params = params.clone();
            Box::pin(async move { tx.fetch_optional(sql, &params).await })
        })
        .await
    }

    pub async fn fetch_all(
        &self,
        label: &'static str,
        sql: &'static str,
        params: Vec<SqlValue>,
    ) -> Result<Vec<SqliteRow>, StorageError> {
        self.transaction(label, move |mut tx| {
            let params = params.clone();
            Box::pin(async move { tx.fetch_all(sql, &params).await })
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::Row;
    use std::sync::atomic::{AtomicU32, Ordering};

    async fn test_client(dir: &tempfile::TempDir) -> SqliteClient {
        let client = SqliteClient::connect(&dir.path().join("test.db"), 2, RetryPolicy::default())
            .await
            .unwrap();
        client
            .execute(
                "create",
                "CREATE TABLE items (id INTEGER PRIMARY KEY, v INTEGER NOT NULL)",
                vec![],
            )
            .await
            .unwrap();
        client
    }

    async fn count_items(client: &SqliteClient) -> i64 {
        let rows = client
            .fetch_all("count", "SELECT COUNT(*) FROM items", vec![])
            .await
            .unwrap();
        rows[0].get::<i64, _>(0)
    }

    fn protocol_is_conflict(err: &sqlx::Error) -> FailureClass {
        match err {
            sqlx::Error::Protocol(_) => FailureClass::TransientConflict,
            other => classify_sqlx_error(other),
        }
    }

    #[tokio::test]
    async fn failed_unit_leaves_no_partial_writes() {
        let dir = tempfile::tempdir().unwrap();
        let client = test_client(&dir).await;

        let result = client
            .transaction("insert twice", |mut tx| {
                Box::pin(async move {
                    tx.execute("INSERT INTO items (id, v) VALUES (1, 10)", &[])
                        .await?;
                    // Primary key violation.
                    tx.execute("INSERT INTO items (id, v) VALUES (1, 20)", &[])
                        .await?;
                    Ok(())
                })
            })
            .await;

        assert!(matches!(result, Err(StorageError::Query(_))));
        assert_eq!(count_items(&client).await, 0);
    }

    #[tokio::test]
    async fn conflicts_rerun_the_whole_unit() {
        let dir = tempfile::tempdir().unwrap();
        let client = test_client(&dir).await.with_classifier(protocol_is_conflict);
        let calls = AtomicU32::new(0);

        let attempts = client
            .transaction("flaky", |mut tx| {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                Box::pin(async move {
                    tx.execute(
                        "INSERT INTO items (v) VALUES (?)",
                        &[SqlValue::Int(n as i64)],
                    )
                    .await?;
                    if n < 3 {
                        return Err(sqlx::Error::Protocol("restart transaction".into()));
                    }
                    Ok(n)
                })
            })
            .await
            .unwrap();

        assert_eq!(attempts, 3);
        let rows = client
            .fetch_all("read", "SELECT v FROM items", vec![])
            .await
            .unwrap();
        let values: Vec<i64> = rows.iter().map(|r| r.get("v")).collect();
        assert_eq!(values, [3]);
    }

    #[tokio::test]
    async fn persistent_conflicts_give_up_after_three_attempts() {
        let dir = tempfile::tempdir().unwrap();
        let client = test_client(&dir).await.with_classifier(protocol_is_conflict);
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = client
            .transaction("always busy", |_tx| {
                calls.fetch_add(1, Ordering::SeqCst);
                Box::pin(async move { Err(sqlx::Error::Protocol("database is locked".into())) })
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        match result {
            Err(StorageError::TransientConflict { attempts, message }) => {
                assert_eq!(attempts, 3);
                assert!(message.contains("database is locked"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn broken_connection_is_retried_once() {
        let dir = tempfile::tempdir().unwrap();
        let client = test_client(&dir).await;
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = client
            .transaction("io", |_tx| {
                calls.fetch_add(1, Ordering::SeqCst);
                Box::pin(async move {
                    Err(sqlx::Error::Io(std::io::Error::new(
                        std::io::ErrorKind::ConnectionReset,
                        "connection reset",
                    )))
                })
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(matches!(result, Err(StorageError::Unavailable(_))));
    }

    #[tokio::test]
    async fn fatal_errors_run_once() {
        let dir = tempfile::tempdir().unwrap();
        let client = test_client(&dir).await;
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = client
            .transaction("bad sql", |mut tx| {
                calls.fetch_add(1, Ordering::SeqCst);
                Box::pin(async move {
                    tx.execute("SELECT * FROM missing_table", &[]).await?;
                    Ok(())
                })
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(StorageError::Query(_))));
    }

    #[test]
    fn default_classifier() {
        assert_eq!(
            classify_sqlx_error(&sqlx::Error::PoolTimedOut),
            FailureClass::Connection
        );
        assert_eq!(
            classify_sqlx_error(&sqlx::Error::RowNotFound),
            FailureClass::Fatal
        );
        assert_eq!(
            classify_sqlx_error(&sqlx::Error::Protocol("x".into())),
            FailureClass::Fatal
        );
    }
}
