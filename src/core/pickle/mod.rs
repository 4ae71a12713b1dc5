// The pickle game: one random size per user per month, a ranked leaderboard that can be
// browsed per server or globally, and a monthly sweep that archives and resets sizes.
// Like the rest of `core`, nothing in here knows about serenity or poise.

pub mod leaderboard;
pub mod leaderboard_view;
pub mod monthly_reset;
pub mod pickle_models;
pub mod pickle_service;
pub mod pickle_store;
pub mod view_sessions;

pub use leaderboard::{
    Identity, IdentityCache, IdentityError, IdentityResolver, UnscopedResolution,
};
pub use leaderboard_view::{LeaderboardView, Scope, ViewAction, ViewSettings, ViewTransition};
pub use monthly_reset::{AnnounceError, MonthlyResetHandle, MonthlyResetTask, ResetAnnouncer};
pub use pickle_models::{HistoryPoint, HistorySummary, RankedSize, ResetPeriod, ResetSummary};
pub use pickle_service::{PickleConfig, PickleService};
pub use pickle_store::PickleStore;
pub use view_sessions::{SessionKey, ViewSessions};
