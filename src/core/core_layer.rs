// The core module contains all business logic.
// Nothing in here depends on serenity or poise.

#[path = "storage/mod.rs"]
pub mod storage;

#[path = "pickle/mod.rs"]
pub mod pickle;

#[path = "help/command_registry.rs"]
pub mod help;

#[path = "config/bot_config.rs"]
pub mod config;
