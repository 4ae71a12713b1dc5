// The infra module contains implementations of core traits.
// Each feature implementation goes in its own submodule.

#[path = "persistence/mod.rs"]
pub mod persistence;

#[path = "pickle/mod.rs"]
pub mod pickle;

#[path = "log_setup.rs"]
pub mod log_setup;
