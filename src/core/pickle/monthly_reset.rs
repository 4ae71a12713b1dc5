// Monthly sweep: on the first hour of a month, archive every current size into history
// and start everyone from scratch.
//
// The loop wakes on a fixed interval and only acts when the wall clock (in the configured
// zone) reads day 1, hour 0. Waking twice in that hour is harmless: the store keys each
// sweep by its month and skips one that already ran.

use super::pickle_models::{ResetPeriod, ResetSummary};
use super::pickle_service::{PickleError, PickleService};
use super::pickle_store::PickleStore;
use async_trait::async_trait;
use chrono::{DateTime, Datelike, LocalResult, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("announcement failed: {0}")]
pub struct AnnounceError(pub String);

/// Where reset announcements go (one context per server in production).
#[async_trait]
pub trait ResetAnnouncer: Send + Sync {
    async fn contexts(&self) -> Vec<u64>;
    async fn announce(&self, context: u64) -> Result<(), AnnounceError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetOutcome {
    /// Not the first hour of a month.
    NotDue,
    /// This month's sweep is already in the ledger.
    AlreadyDone,
    Completed {
        summary: ResetSummary,
        announced: usize,
        failed: usize,
    },
}

/// The period to sweep if `now` falls on local day 1, hour 0.
pub fn reset_period(now: DateTime<Utc>, tz: Tz) -> Option<ResetPeriod> {
    let local = now.with_timezone(&tz);
    if local.day() != 1 || local.hour() != 0 {
        return None;
    }

    let (year, month) = (local.year(), local.month());
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };

    Some(ResetPeriod {
        month_key: format!("{year:04}-{month:02}"),
        month_start: local_month_start(tz, year, month)?,
        next_month_start: local_month_start(tz, next_year, next_month)?,
        at: now,
    })
}

fn local_month_start(tz: Tz, year: i32, month: u32) -> Option<DateTime<Utc>> {
    match tz.with_ymd_and_hms(year, month, 1, 0, 0, 0) {
        LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _) => Some(earliest.with_timezone(&Utc)),
        LocalResult::None => None,
    }
}

/// One check of the sweep. Announcements only go out after the reset has committed,
/// and a failed announcement never undoes it.
pub async fn run_monthly_reset<S, A>(
    service: &PickleService<S>,
    announcer: &A,
    now: DateTime<Utc>,
    tz: Tz,
) -> Result<ResetOutcome, PickleError>
where
    S: PickleStore,
    A: ResetAnnouncer + ?Sized,
{
    let Some(period) = reset_period(now, tz) else {
        return Ok(ResetOutcome::NotDue);
    };

    let Some(summary) = service.archive_and_reset(&period).await? else {
        tracing::info!(month = %period.month_key, "Monthly pickle reset already done");
        return Ok(ResetOutcome::AlreadyDone);
    };

    tracing::info!(
        month = %period.month_key,
        archived = summary.archived,
        cleared = summary.cleared,
        "Monthly pickle reset committed"
    );

    let mut announced = 0;
    let mut failed = 0;
    for context in announcer.contexts().await {
        match announcer.announce(context).await {
            Ok(()) => announced += 1,
            Err(e) => {
                failed += 1;
                tracing::warn!(guild_id = context, error = %e, "Failed to announce pickle reset");
            }
        }
    }

    Ok(ResetOutcome::Completed {
        summary,
        announced,
        failed,
    })
}

/// Handle to the background sweep loop.
pub struct MonthlyResetHandle {
    shutdown: watch::Sender<bool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl MonthlyResetHandle {
    /// Stop the loop and wait for it. A check in progress finishes first.
    ///
    /// Calling it again is a no-op.
    pub async fn shutdown(&self) {
        let _ = self.shutdown.send(true);

        let Some(handle) = self.handle.lock().await.take() else {
            return;
        };
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "Monthly reset task ended abnormally");
        }
    }
}

pub struct MonthlyResetTask;

impl MonthlyResetTask {
    pub fn spawn<S>(
        service: Arc<PickleService<S>>,
        announcer: Arc<dyn ResetAnnouncer>,
        every: Duration,
        tz: Tz,
    ) -> MonthlyResetHandle
    where
        S: PickleStore + 'static,
    {
        let (shutdown, mut stop) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            tracing::info!(every_secs = every.as_secs(), timezone = %tz, "Monthly reset task started");

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if let Err(e) = run_monthly_reset(service.as_ref(), announcer.as_ref(), Utc::now(), tz).await {
                            tracing::error!(error = %e, "Monthly pickle reset failed");
                        }
                    }
                    changed = stop.changed() => {
                        if changed.is_err() || *stop.borrow() {
                            break;
                        }
                    }
                }
            }

            tracing::info!("Monthly reset task stopped");
        });

        MonthlyResetHandle {
            shutdown,
            handle: Mutex::new(Some(handle)),
        }
    }
}
