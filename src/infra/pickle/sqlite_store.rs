use crate::core::pickle::{HistoryPoint, PickleStore, RankedSize, ResetPeriod, ResetSummary};
use crate::core::storage::StorageError;
use crate::infra::persistence::{SqlValue, SqliteClient};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

/// Timestamps are stored as fixed-width RFC 3339 text (`2024-05-01T00:00:00.000000Z`) so
/// string comparison in SQL orders them chronologically.
fn timestamp(at: DateTime<Utc>) -> SqlValue {
    SqlValue::Text(at.to_rfc3339_opts(SecondsFormat::Micros, true))
}

fn query_error(e: impl std::fmt::Display) -> StorageError {
    StorageError::Query(e.to_string())
}

pub struct SqlitePickleStore {
    client: SqliteClient,
}

impl SqlitePickleStore {
    /// Wrap `client` and make sure the schema exists.
    pub async fn new(client: SqliteClient) -> Result<Self, StorageError> {
        let store = Self { client };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<(), StorageError> {
        self.client
            .execute(
                "migrate",
                r#"
                CREATE TABLE IF NOT EXISTS pickle_sizes (
                    user_id INTEGER PRIMARY KEY,
                    current_size INTEGER NOT NULL,
                    last_updated TEXT NOT NULL
                );
                "#,
                vec![],
            )
            .await?;

        self.client
            .execute(
                "migrate",
                r#"
                CREATE TABLE IF NOT EXISTS pickle_history (
                    user_id INTEGER NOT NULL,
                    size INTEGER NOT NULL,
                    recorded_at TEXT NOT NULL,
                    PRIMARY KEY (user_id, recorded_at)
                );
                "#,
                vec![],
            )
            .await?;

        // One row per completed monthly sweep.
        self.client
            .execute(
                "migrate",
                r#"
                CREATE TABLE IF NOT EXISTS pickle_resets (
                    month_key TEXT PRIMARY KEY,
                    performed_at TEXT NOT NULL,
                    archived INTEGER NOT NULL,
                    cleared INTEGER NOT NULL
                );
                "#,
                vec![],
            )
            .await?;

        Ok(())
    }
}

fn history_point(row: &SqliteRow) -> Result<HistoryPoint, StorageError> {
    let size: i64 = row.try_get("size").map_err(query_error)?;
    let recorded_at: String = row.try_get("recorded_at").map_err(query_error)?;
    let recorded_at = DateTime::parse_from_rfc3339(&recorded_at).map_err(query_error)?;

    Ok(HistoryPoint {
        date: recorded_at.with_timezone(&Utc).date_naive(),
        size,
    })
}

#[async_trait]
impl PickleStore for SqlitePickleStore {
    async fn get_size(&self, user_id: u64) -> Result<Option<i64>, StorageError> {
        let row = self
            .client
            .fetch_optional(
                "get_size",
                "SELECT current_size FROM pickle_sizes WHERE user_id = ?",
                vec![SqlValue::Int(user_id as i64)],
            )
            .await?;

        row.map(|row| row.try_get::<i64, _>("current_size"))
            .transpose()
            .map_err(query_error)
    }

    async fn set_size(
        &self,
        user_id: u64,
        size: i64,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let params = vec![SqlValue::Int(user_id as i64), SqlValue::Int(size), timestamp(at)];

        self.client
            .transaction("set_size", move |mut tx| {
                let params = params.clone();
                Box::pin(async move {
                    tx.execute(
                        r#"
                        INSERT INTO pickle_sizes (user_id, current_size, last_updated)
                        VALUES (?, ?, ?)
                        ON CONFLICT(user_id) DO UPDATE SET
                            current_size = excluded.current_size,
                            last_updated = excluded.last_updated
                        "#,
                        &params,
                    )
                    .await?;

                    tx.execute(
                        r#"
                        INSERT INTO pickle_history (user_id, size, recorded_at)
                        VALUES (?, ?, ?)
                        ON CONFLICT(user_id, recorded_at) DO NOTHING
                        "#,
                        &params,
                    )
                    .await?;

                    Ok(())
                })
            })
            .await
    }

    async fn get_leaderboard(&self) -> Result<Vec<RankedSize>, StorageError> {
        let rows = self
            .client
            .fetch_all(
                "get_leaderboard",
                "SELECT user_id, current_size FROM pickle_sizes ORDER BY current_size DESC, user_id ASC",
                vec![],
            )
            .await?;

        rows.iter()
            .map(|row| {
                Ok(RankedSize {
                    user_id: row.try_get::<i64, _>("user_id").map_err(query_error)? as u64,
                    size: row.try_get("current_size").map_err(query_error)?,
                })
            })
            .collect()
    }

    async fn get_history(
        &self,
        user_id: u64,
        since: DateTime<Utc>,
    ) -> Result<Vec<HistoryPoint>, StorageError> {
        let rows = self
            .client
            .fetch_all(
                "get_history",
                r#"
                SELECT size, recorded_at FROM pickle_history
                WHERE user_id = ? AND recorded_at > ?
                ORDER BY recorded_at ASC
                "#,
                vec![SqlValue::Int(user_id as i64), timestamp(since)],
            )
            .await?;

        rows.iter().map(history_point).collect()
    }

    async fn archive_and_reset(
        &self,
        period: &ResetPeriod,
    ) -> Result<Option<ResetSummary>, StorageError> {
        let month_key = SqlValue::Text(period.month_key.clone());
        let at = timestamp(period.at);
        let month_start = timestamp(period.month_start);
        let next_month_start = timestamp(period.next_month_start);

        self.client
            .transaction("archive_and_reset", move |mut tx| {
                let month_key = month_key.clone();
                let archive_params = [at.clone(), month_start.clone(), next_month_start.clone()];
                let at = at.clone();

                Box::pin(async move {
                    let done = tx
                        .fetch_optional(
                            "SELECT 1 FROM pickle_resets WHERE month_key = ?",
                            std::slice::from_ref(&month_key),
                        )
                        .await?;
                    if done.is_some() {
                        return Ok(None);
                    }

                    // Users who already have a row this month keep it; everyone else gets
                    // their final size archived.
                    let archived = tx
                        .execute(
                            r#"
                            INSERT INTO pickle_history (user_id, size, recorded_at)
                            SELECT s.user_id, s.current_size, ?
                            FROM pickle_sizes s
                            WHERE NOT EXISTS (
                                SELECT 1 FROM pickle_history h
                                WHERE h.user_id = s.user_id
                                  AND h.recorded_at >= ?
                                  AND h.recorded_at < ?
                            )
                            "#,
                            &archive_params,
                        )
                        .await?;

                    let cleared = tx.execute("DELETE FROM pickle_sizes", &[]).await?;

                    tx.execute(
                        r#"
                        INSERT INTO pickle_resets (month_key, performed_at, archived, cleared)
                        VALUES (?, ?, ?, ?)
                        "#,
                        &[
                            month_key,
                            at,
                            SqlValue::Int(archived as i64),
                            SqlValue::Int(cleared as i64),
                        ],
                    )
                    .await?;

                    Ok(Some(ResetSummary { archived, cleared }))
                })
            })
            .await
    }

    async fn clear_all(&self) -> Result<(), StorageError> {
        self.client
            .transaction("clear_all", |mut tx| {
                Box::pin(async move {
                    tx.execute("DELETE FROM pickle_sizes", &[]).await?;
                    tx.execute("DELETE FROM pickle_history", &[]).await?;
                    Ok(())
                })
            })
            .await
    }
}
