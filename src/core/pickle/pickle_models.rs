use chrono::{DateTime, NaiveDate, Utc};

/// A leaderboard row as the store returns it, before any name is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankedSize {
    pub user_id: u64,
    pub size: i64,
}

/// A history row reduced to its calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryPoint {
    pub date: NaiveDate,
    pub size: i64,
}

/// Result of the fetch-or-initialize read behind `/pickle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeRoll {
    pub size: i64,
    /// True when the size was rolled by this call.
    pub is_new: bool,
}

/// The size a user ended a calendar month with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthlySize {
    /// First day of the month.
    pub month: NaiveDate,
    pub size: i64,
}

impl MonthlySize {
    /// Short month name, e.g. "Jan".
    pub fn label(&self) -> String {
        self.month.format("%b").to_string()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistorySummary {
    /// Ascending by month.
    pub months: Vec<MonthlySize>,
    pub best: MonthlySize,
    /// Mean of the monthly sizes, rounded to two decimals.
    pub average: f64,
}

/// The month a reset sweep is operating on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetPeriod {
    /// `YYYY-MM` in the reset timezone; the idempotence key of the sweep.
    pub month_key: String,
    pub month_start: DateTime<Utc>,
    pub next_month_start: DateTime<Utc>,
    /// Timestamp written on archived history rows.
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResetSummary {
    /// Sizes copied into history by the sweep.
    pub archived: u64,
    /// Current sizes removed.
    pub cleared: u64,
}
