//! Environment-driven configuration.
//!
//! | variable | default | meaning |
//! |---|---|---|
//! | `LARDER_LOCK_TIMEOUT_MS` | `2000` | bound on acquiring every row lock of one demand vector |
//! | `LARDER_MAX_CONFLICT_RETRIES` | `3` | optimistic retries after a store version mismatch |
//! | `USE_PERSISTENT_STORES` | `false` | use Postgres instead of the in-memory store |
//! | `DATABASE_URL` | none | required when `USE_PERSISTENT_STORES=true` |

use std::time::Duration;

use thiserror::Error;

pub const LOCK_TIMEOUT_MS: &str = "LARDER_LOCK_TIMEOUT_MS";
pub const MAX_CONFLICT_RETRIES: &str = "LARDER_MAX_CONFLICT_RETRIES";
pub const USE_PERSISTENT_STORES: &str = "USE_PERSISTENT_STORES";
pub const DATABASE_URL: &str = "DATABASE_URL";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0} must be set")]
    Missing(&'static str),
}

/// Ledger tuning knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerConfig {
    pub lock_timeout: Duration,
    pub max_conflict_retries: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_millis(2000),
            max_conflict_retries: 3,
        }
    }
}

impl LedgerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`LedgerConfig::from_env`] over an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let lock_timeout = match lookup(LOCK_TIMEOUT_MS) {
            Some(raw) => {
                let ms: u64 = parse(LOCK_TIMEOUT_MS, &raw)?;
                if ms == 0 {
                    return Err(ConfigError::Invalid {
                        key: LOCK_TIMEOUT_MS,
                        value: raw,
                        reason: "must be greater than zero".to_string(),
                    });
                }
                Duration::from_millis(ms)
            }
            None => defaults.lock_timeout,
        };

        let max_conflict_retries = match lookup(MAX_CONFLICT_RETRIES) {
            Some(raw) => parse(MAX_CONFLICT_RETRIES, &raw)?,
            None => defaults.max_conflict_retries,
        };

        Ok(Self {
            lock_timeout,
            max_conflict_retries,
        })
    }
}

/// Which [`StockStore`](crate::stock_store::StockStore) backs the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    InMemory,
    Postgres { database_url: String },
}

impl StoreConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let use_persistent = match lookup(USE_PERSISTENT_STORES) {
            Some(raw) => parse::<bool>(USE_PERSISTENT_STORES, &raw.to_ascii_lowercase())?,
            None => false,
        };

        if !use_persistent {
            return Ok(StoreConfig::InMemory);
        }

        match lookup(DATABASE_URL) {
            Some(url) if !url.trim().is_empty() => Ok(StoreConfig::Postgres { database_url: url }),
            _ => Err(ConfigError::Missing(DATABASE_URL)),
        }
    }
}

/// Everything the engine reads from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LarderConfig {
    pub ledger: LedgerConfig,
    pub store: StoreConfig,
}

impl LarderConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            ledger: LedgerConfig::from_lookup(&lookup)?,
            store: StoreConfig::from_lookup(&lookup)?,
        })
    }
}

fn parse<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
        key,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}
