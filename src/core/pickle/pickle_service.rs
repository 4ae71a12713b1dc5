// Business logic for the pickle game.
// The service owns the rules (size range, history window, id validation) and delegates
// every read and write to a `PickleStore` injected at construction.

use super::pickle_models::{
    HistoryPoint, HistorySummary, MonthlySize, RankedSize, ResetPeriod, ResetSummary, SizeRoll,
};
use super::pickle_store::PickleStore;
use crate::core::storage::StorageError;
use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use rand::Rng;
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum PickleError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Invalid user ID")]
    InvalidId,
}

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickleConfig {
    /// Smallest size a roll can produce (inclusive).
    pub min_size: i64,
    /// Largest size a roll can produce (inclusive).
    pub max_size: i64,
    /// How far back `/picklegraph` looks.
    pub history_months: u32,
}

impl Default for PickleConfig {
    fn default() -> Self {
        Self {
            min_size: 3,
            max_size: 32,
            history_months: 12,
        }
    }
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct PickleService<S: PickleStore> {
    store: S,
    config: PickleConfig,
}

impl<S: PickleStore> PickleService<S> {
    pub fn new(store: S) -> Self {
        Self::new_with_config(store, PickleConfig::default())
    }

    pub fn new_with_config(store: S, config: PickleConfig) -> Self {
        Self { store, config }
    }

    fn validate_id(user_id: u64) -> Result<(), PickleError> {
        if user_id == 0 {
            Err(PickleError::InvalidId)
        } else {
            Ok(())
        }
    }

    pub async fn get_size(&self, user_id: u64) -> Result<Option<i64>, PickleError> {
        Self::validate_id(user_id)?;
        Ok(self.store.get_size(user_id).await?)
    }

    pub async fn set_size(&self, user_id: u64, size: i64) -> Result<(), PickleError> {
        Self::validate_id(user_id)?;
        self.store.set_size(user_id, size, Utc::now()).await?;
        Ok(())
    }

    /// Read the user's size, rolling and persisting a fresh one on a miss.
    pub async fn get_or_roll(&self, user_id: u64) -> Result<SizeRoll, PickleError> {
        if let Some(size) = self.get_size(user_id).await? {
            return Ok(SizeRoll {
                size,
                is_new: false,
            });
        }

        let size = self.roll_size();
        self.set_size(user_id, size).await?;
        tracing::info!(user_id, size, "Rolled new pickle size");

        Ok(SizeRoll { size, is_new: true })
    }

    fn roll_size(&self) -> i64 {
        let (low, high) = if self.config.min_size <= self.config.max_size {
            (self.config.min_size, self.config.max_size)
        } else {
            (self.config.max_size, self.config.min_size)
        };
        rand::thread_rng().gen_range(low..=high)
    }

    pub async fn leaderboard(&self) -> Result<Vec<RankedSize>, PickleError> {
        Ok(self.store.get_leaderboard().await?)
    }

    /// History inside the configured trailing window.
    pub async fn history(&self, user_id: u64) -> Result<Vec<HistoryPoint>, PickleError> {
        self.history_since(user_id, self.config.history_months, Utc::now())
            .await
    }

    pub async fn history_since(
        &self,
        user_id: u64,
        months_back: u32,
        now: DateTime<Utc>,
    ) -> Result<Vec<HistoryPoint>, PickleError> {
        Self::validate_id(user_id)?;
        let since = now
            .checked_sub_months(Months::new(months_back))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        Ok(self.store.get_history(user_id, since).await?)
    }

    pub async fn history_summary(
        &self,
        user_id: u64,
    ) -> Result<Option<HistorySummary>, PickleError> {
        let history = self.history(user_id).await?;
        Ok(summarize_history(&history))
    }

    pub async fn archive_and_reset(
        &self,
        period: &ResetPeriod,
    ) -> Result<Option<ResetSummary>, PickleError> {
        Ok(self.store.archive_and_reset(period).await?)
    }

    pub async fn clear_all(&self) -> Result<(), PickleError> {
        self.store.clear_all().await?;
        tracing::warn!("All pickle sizes and history were cleared");
        Ok(())
    }
}

/// Collapse history rows into one value per calendar month (the last one recorded).
///
/// `points` must be ascending by date, which is what the store returns.
pub fn summarize_history(points: &[HistoryPoint]) -> Option<HistorySummary> {
    let mut months: Vec<MonthlySize> = Vec::new();

    for point in points {
        let month = NaiveDate::from_ymd_opt(point.date.year(), point.date.month(), 1)?;
        match months.last_mut() {
            Some(last) if last.month == month => last.size = point.size,
            _ => months.push(MonthlySize {
                month,
                size: point.size,
            }),
        }
    }

    let mut best = *months.first()?;
    for month in &months {
        if month.size > best.size {
            best = *month;
        }
    }

    let total: i64 = months.iter().map(|m| m.size).sum();
    let average = total as f64 / months.len() as f64;
    let average = (average * 100.0).round() / 100.0;

    Some(HistorySummary {
        months,
        best,
        average,
    })
}

// ============================================================================
// TESTS
// ============================================================================
