// Process-wide settings, read once at startup and shared through `Data`.

use crate::core::pickle::{PickleConfig, ViewSettings};
use crate::core::storage::RetryPolicy;
use chrono_tz::Tz;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub discord_token: String,
    pub database_path: PathBuf,
    pub database_max_connections: u32,
    pub owner_id: Option<u64>,
    /// Register commands in this guild only (instant updates while developing).
    pub dev_guild_id: Option<u64>,
    pub log_dir: PathBuf,
    pub pickle_min_size: i64,
    pub pickle_max_size: i64,
    pub pickle_history_months: u32,
    pub leaderboard_page_size: usize,
    pub leaderboard_timeout: Duration,
    pub leaderboard_batch_size: usize,
    pub reset_check_interval: Duration,
    pub reset_timezone: Tz,
    pub storage_max_attempts: u32,
}

impl BotConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key/value source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let discord_token = get("DISCORD_TOKEN").ok_or(ConfigError::Missing("DISCORD_TOKEN"))?;

        let pickle_min_size = parse_or(&get, "PICKLE_MIN_SIZE", 3i64)?;
        let pickle_max_size = parse_or(&get, "PICKLE_MAX_SIZE", 32i64)?;
        if pickle_min_size > pickle_max_size {
            return Err(ConfigError::Invalid {
                key: "PICKLE_MIN_SIZE",
                value: format!("{pickle_min_size} > PICKLE_MAX_SIZE {pickle_max_size}"),
            });
        }

        let leaderboard_page_size = parse_or(&get, "LEADERBOARD_PAGE_SIZE", 10usize)?;
        if leaderboard_page_size == 0 {
            return Err(ConfigError::Invalid {
                key: "LEADERBOARD_PAGE_SIZE",
                value: "0".to_string(),
            });
        }

        let reset_timezone = match get("RESET_TIMEZONE") {
            Some(raw) => raw.parse::<Tz>().map_err(|_| ConfigError::Invalid {
                key: "RESET_TIMEZONE",
                value: raw,
            })?,
            None => Tz::UTC,
        };

        Ok(Self {
            discord_token,
            database_path: get("DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data/pickle.db")),
            database_max_connections: parse_or(&get, "DATABASE_MAX_CONNECTIONS", 5u32)?.max(1),
            owner_id: parse_opt(&get, "BOT_OWNER_ID")?,
            dev_guild_id: parse_opt(&get, "DEV_GUILD_ID")?,
            log_dir: get("LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("logs")),
            pickle_min_size,
            pickle_max_size,
            pickle_history_months: parse_or(&get, "PICKLE_HISTORY_MONTHS", 12u32)?,
            leaderboard_page_size,
            leaderboard_timeout: Duration::from_secs(parse_or(
                &get,
                "LEADERBOARD_TIMEOUT_SECS",
                180u64,
            )?),
            leaderboard_batch_size: parse_or(&get, "LEADERBOARD_BATCH_SIZE", 50usize)?.max(1),
            reset_check_interval: Duration::from_secs(
                parse_or(&get, "RESET_CHECK_INTERVAL_SECS", 3600u64)?.max(1),
            ),
            reset_timezone,
            storage_max_attempts: parse_or(&get, "STORAGE_MAX_ATTEMPTS", 3u32)?.max(1),
        })
    }
}

impl BotConfig {
    pub fn pickle_config(&self) -> PickleConfig {
        PickleConfig {
            min_size: self.pickle_min_size,
            max_size: self.pickle_max_size,
            history_months: self.pickle_history_months,
        }
    }

    pub fn view_settings(&self) -> ViewSettings {
        ViewSettings {
            page_size: self.leaderboard_page_size,
            timeout: self.leaderboard_timeout,
            batch_size: self.leaderboard_batch_size,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::with_max_attempts(self.storage_max_attempts)
    }
}

fn parse_opt<T, G>(get: &G, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
        None => Ok(None),
    }
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    Ok(parse_opt(get, key)?.unwrap_or(default))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<BotConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        BotConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn token_is_required() {
        assert_eq!(
            config_from(&[]).unwrap_err(),
            ConfigError::Missing("DISCORD_TOKEN")
        );
        assert_eq!(
            config_from(&[("DISCORD_TOKEN", "  ")]).unwrap_err(),
            ConfigError::Missing("DISCORD_TOKEN")
        );
    }

    #[test]
    fn defaults_apply_when_only_the_token_is_set() {
        let config = config_from(&[("DISCORD_TOKEN", "abc")]).unwrap();

        assert_eq!(config.database_path, PathBuf::from("data/pickle.db"));
        assert_eq!(config.database_max_connections, 5);
        assert_eq!(config.owner_id, None);
        assert_eq!((config.pickle_min_size, config.pickle_max_size), (3, 32));
        assert_eq!(config.pickle_history_months, 12);
        assert_eq!(config.leaderboard_page_size, 10);
        assert_eq!(config.leaderboard_timeout, Duration::from_secs(180));
        assert_eq!(config.leaderboard_batch_size, 50);
        assert_eq!(config.reset_check_interval, Duration::from_secs(3600));
        assert_eq!(config.reset_timezone, Tz::UTC);
        assert_eq!(config.storage_max_attempts, 3);
        assert_eq!(config.pickle_config(), PickleConfig::default());
        assert_eq!(config.view_settings(), ViewSettings::default());
        assert_eq!(config.retry_policy(), RetryPolicy::default());
    }

    #[test]
    fn overrides_are_parsed() {
        let config = config_from(&[
            ("DISCORD_TOKEN", "abc"),
            ("BOT_OWNER_ID", "1234"),
            ("DEV_GUILD_ID", "5678"),
            ("LEADERBOARD_PAGE_SIZE", "5"),
            ("RESET_TIMEZONE", "Europe/Berlin"),
            ("LOG_DIR", "/var/log/pickle"),
        ])
        .unwrap();

        assert_eq!(config.owner_id, Some(1234));
        assert_eq!(config.dev_guild_id, Some(5678));
        assert_eq!(config.leaderboard_page_size, 5);
        assert_eq!(config.reset_timezone, Tz::Europe__Berlin);
        assert_eq!(config.log_dir, PathBuf::from("/var/log/pickle"));
    }

    #[test]
    fn bad_values_name_the_variable() {
        let err = config_from(&[("DISCORD_TOKEN", "abc"), ("BOT_OWNER_ID", "me")]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                key: "BOT_OWNER_ID",
                value: "me".into()
            }
        );

        let err =
            config_from(&[("DISCORD_TOKEN", "abc"), ("RESET_TIMEZONE", "Mars/Base")]).unwrap_err();
        assert!(err.to_string().contains("RESET_TIMEZONE"));
    }

    #[test]
    fn size_range_and_page_size_are_validated() {
        let err = config_from(&[
            ("DISCORD_TOKEN", "abc"),
            ("PICKLE_MIN_SIZE", "40"),
            ("PICKLE_MAX_SIZE", "10"),
        ])
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                key: "PICKLE_MIN_SIZE",
                ..
            }
        ));

        let err =
            config_from(&[("DISCORD_TOKEN", "abc"), ("LEADERBOARD_PAGE_SIZE", "0")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                key: "LEADERBOARD_PAGE_SIZE",
                ..
            }
        ));
    }
}
