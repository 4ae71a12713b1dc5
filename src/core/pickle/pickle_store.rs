use super::pickle_models::{HistoryPoint, RankedSize, ResetPeriod, ResetSummary};
use crate::core::storage::StorageError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Persistence port for the pickle game.
///
/// Implementations must make `set_size` atomic: the current-size upsert and the history
/// append either both land or neither does.
#[async_trait]
pub trait PickleStore: Send + Sync {
    /// Current size, or `None` if the user has not rolled this month.
    async fn get_size(&self, user_id: u64) -> Result<Option<i64>, StorageError>;

    /// Upsert the current size and append a history row stamped `at`.
    ///
    /// History is append-only: if the user already has a row stamped `at`, it is kept.
    async fn set_size(&self, user_id: u64, size: i64, at: DateTime<Utc>)
        -> Result<(), StorageError>;

    /// All current sizes, largest first. Equal sizes are ordered by ascending user id,
    /// which is SQLite row order for `pickle_sizes`.
    async fn get_leaderboard(&self) -> Result<Vec<RankedSize>, StorageError>;

    /// History rows recorded strictly after `since`, oldest first.
    async fn get_history(
        &self,
        user_id: u64,
        since: DateTime<Utc>,
    ) -> Result<Vec<HistoryPoint>, StorageError>;

    /// Archive every current size without a history row in `period`, then clear all
    /// current sizes, in one transaction.
    ///
    /// Returns `None` when a sweep for `period.month_key` has already been recorded.
    async fn archive_and_reset(
        &self,
        period: &ResetPeriod,
    ) -> Result<Option<ResetSummary>, StorageError>;

    /// Delete every current size and every history row.
    async fn clear_all(&self) -> Result<(), StorageError>;
}
