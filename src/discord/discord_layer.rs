// Discord layer - commands, the leaderboard session loop and the serenity-backed
// implementations of the core pickle ports.

#[path = "commands/command_catalog.rs"]
pub mod commands;

#[path = "pickle/identity.rs"]
pub mod identity;
#[path = "pickle/leaderboard_session.rs"]
pub mod leaderboard_session;
#[path = "pickle/reset_announcements.rs"]
pub mod reset_announcements;

// Re-export command types for convenience
pub use commands::pickle::{Data, Error};
