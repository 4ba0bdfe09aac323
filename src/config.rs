use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use log::LevelFilter;
use thiserror::Error;

pub const HOST_VAR: &str = "TWITTER_API_HOST";
pub const PORT_VAR: &str = "TWITTER_API_PORT";
pub const DATA_DIR_VAR: &str = "TWITTER_API_DATA_DIR";
pub const WORKERS_VAR: &str = "TWITTER_API_WORKERS";
pub const BCRYPT_COST_VAR: &str = "TWITTER_API_BCRYPT_COST";
pub const LOCK_TIMEOUT_VAR: &str = "TWITTER_API_LOCK_TIMEOUT_MS";
pub const LOG_VAR: &str = "TWITTER_API_LOG";

/// Cheapest bcrypt cost accepted. Tests hash with it.
pub const MIN_BCRYPT_COST: u32 = 4;
pub const MAX_BCRYPT_COST: u32 = 31;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub workers: usize,
    pub bcrypt_cost: u32,
    pub lock_timeout: Duration,
    pub log_level: LevelFilter,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 8080,
            data_dir: PathBuf::from("."),
            workers: num_cpus::get(),
            bcrypt_cost: bcrypt::DEFAULT_COST,
            lock_timeout: Duration::from_millis(5000),
            log_level: LevelFilter::Debug,
        }
    }
}

impl Config {
    /// Read the environment, after loading `.env` if there is one.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build a config from any variable source. Unset variables keep their
    /// defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let bcrypt_cost = parse(&lookup, BCRYPT_COST_VAR, defaults.bcrypt_cost)?;
        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&bcrypt_cost) {
            return Err(ConfigError::Invalid {
                var: BCRYPT_COST_VAR,
                value: bcrypt_cost.to_string(),
                reason: format!("must be between {MIN_BCRYPT_COST} and {MAX_BCRYPT_COST}"),
            });
        }
        let workers = parse(&lookup, WORKERS_VAR, defaults.workers)?;
        if workers == 0 {
            return Err(ConfigError::Invalid {
                var: WORKERS_VAR,
                value: "0".to_owned(),
                reason: "must be at least 1".to_owned(),
            });
        }
        let lock_timeout_ms = parse(
            &lookup,
            LOCK_TIMEOUT_VAR,
            defaults.lock_timeout.as_millis() as u64,
        )?;

        Ok(Self {
            host: lookup(HOST_VAR).unwrap_or(defaults.host),
            port: parse(&lookup, PORT_VAR, defaults.port)?,
            data_dir: lookup(DATA_DIR_VAR)
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            workers,
            bcrypt_cost,
            lock_timeout: Duration::from_millis(lock_timeout_ms),
            log_level: parse(&lookup, LOG_VAR, defaults.log_level)?,
        })
    }
}

fn parse<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(var) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: e.to_string(),
            value,
        }),
    }
}
