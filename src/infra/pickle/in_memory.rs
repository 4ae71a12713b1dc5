// In-memory PickleStore used by the service and sweep tests.
// One lock guards all three tables so `set_size` and `archive_and_reset` are atomic
// exactly like their SQLite counterparts.

use crate::core::pickle::{HistoryPoint, PickleStore, RankedSize, ResetPeriod, ResetSummary};
use crate::core::storage::StorageError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tokio::sync::RwLock;

/// The current size for one user. Exactly one per user.
struct PickleRecord {
    user_id: u64,
    current_size: i64,
}

/// One point of a user's size history.
struct HistoryEntry {
    user_id: u64,
    size: i64,
    recorded_at: DateTime<Utc>,
}

#[derive(Default)]
struct Tables {
    sizes: Vec<PickleRecord>,
    history: Vec<HistoryEntry>,
    resets: HashSet<String>,
}

#[derive(Default)]
pub struct InMemoryPickleStore {
    tables: RwLock<Tables>,
}

impl InMemoryPickleStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PickleStore for InMemoryPickleStore {
    async fn get_size(&self, user_id: u64) -> Result<Option<i64>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables
            .sizes
            .iter()
            .find(|r| r.user_id == user_id)
            .map(|r| r.current_size))
    }

    async fn set_size(
        &self,
        user_id: u64,
        size: i64,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let mut tables = self.tables.write().await;

        match tables.sizes.iter_mut().find(|r| r.user_id == user_id) {
            Some(record) => record.current_size = size,
            None => tables.sizes.push(PickleRecord {
                user_id,
                current_size: size,
            }),
        }

        // Same key as the SQLite primary key; an existing row is left as it was.
        let recorded = tables
            .history
            .iter()
            .any(|h| h.user_id == user_id && h.recorded_at == at);
        if !recorded {
            tables.history.push(HistoryEntry {
                user_id,
                size,
                recorded_at: at,
            });
        }

        Ok(())
    }

    async fn get_leaderboard(&self) -> Result<Vec<RankedSize>, StorageError> {
        let tables = self.tables.read().await;
        let mut board: Vec<RankedSize> = tables
            .sizes
            .iter()
            .map(|r| RankedSize {
                user_id: r.user_id,
                size: r.current_size,
            })
            .collect();
        board.sort_by(|a, b| b.size.cmp(&a.size).then(a.user_id.cmp(&b.user_id)));
        Ok(board)
    }

    async fn get_history(
        &self,
        user_id: u64,
        since: DateTime<Utc>,
    ) -> Result<Vec<HistoryPoint>, StorageError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<&HistoryEntry> = tables
            .history
            .iter()
            .filter(|h| h.user_id == user_id && h.recorded_at > since)
            .collect();
        rows.sort_by_key(|h| h.recorded_at);

        Ok(rows
            .into_iter()
            .map(|h| HistoryPoint {
                date: h.recorded_at.date_naive(),
                size: h.size,
            })
            .collect())
    }

    async fn archive_and_reset(
        &self,
        period: &ResetPeriod,
    ) -> Result<Option<ResetSummary>, StorageError> {
        let mut tables = self.tables.write().await;
        if tables.resets.contains(&period.month_key) {
            return Ok(None);
        }

        let in_period = |h: &HistoryEntry, user_id: u64| {
            h.user_id == user_id
                && h.recorded_at >= period.month_start
                && h.recorded_at < period.next_month_start
        };

        let to_archive: Vec<HistoryEntry> = tables
            .sizes
            .iter()
            .filter(|r| !tables.history.iter().any(|h| in_period(h, r.user_id)))
            .map(|r| HistoryEntry {
                user_id: r.user_id,
                size: r.current_size,
                recorded_at: period.at,
            })
            .collect();

        let summary = ResetSummary {
            archived: to_archive.len() as u64,
            cleared: tables.sizes.len() as u64,
        };

        tables.history.extend(to_archive);
        tables.sizes.clear();
        tables.resets.insert(period.month_key.clone());

        Ok(Some(summary))
    }

    async fn clear_all(&self) -> Result<(), StorageError> {
        let mut tables = self.tables.write().await;
        tables.sizes.clear();
        tables.history.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[tokio::test]
    async fn ties_break_on_user_id() {
        let store = InMemoryPickleStore::new();
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        store.set_size(7, 30, at).await.unwrap();
        store.set_size(3, 30, at).await.unwrap();
        store.set_size(5, 10, at).await.unwrap();
        store.set_size(9, 31, at).await.unwrap();

        let ids: Vec<_> = store
            .get_leaderboard()
            .await
            .unwrap()
            .iter()
            .map(|r| r.user_id)
            .collect();
        assert_eq!(ids, [9, 3, 7, 5]);
    }

    #[tokio::test]
    async fn existing_history_rows_are_kept() {
        let store = InMemoryPickleStore::new();
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        store.set_size(1, 12, at).await.unwrap();
        store.set_size(1, 20, at).await.unwrap();

        assert_eq!(store.get_size(1).await.unwrap(), Some(20));
        let history = store.get_history(1, at - chrono::Duration::days(1)).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].size, 12);
    }

    #[tokio::test]
    async fn single_entry_board() {
        let store = InMemoryPickleStore::new();
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        store.set_size(1, 3, at).await.unwrap();

        assert_eq!(
            store.get_leaderboard().await.unwrap(),
            vec![RankedSize { user_id: 1, size: 3 }]
        );
    }
}
