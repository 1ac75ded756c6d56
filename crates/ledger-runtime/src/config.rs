//! # Runtime Configuration
//!
//! Loaded from environment variables. Unset optional variables fall back to
//! their defaults; set but unparseable values are errors rather than being
//! silently ignored.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `CE_CONFIRMATIONS` | 5 |
//! | `CE_POLL_INTERVAL_MS` | 5000 |
//! | `CE_BATCH_SIZE` | 500 |
//! | `CE_DATA_DIR` | `./data` |
//! | `CE_TOKEN_ADDRESS` | required |
//! | `CE_ADMIN_WALLET` | required |
//! | `CE_ARTIFACT_PATH` | unset (migrations disabled) |

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use ce_02_ingestion::IngestionConfig;
use shared_types::Address;
use thiserror::Error;

pub const ENV_CONFIRMATIONS: &str = "CE_CONFIRMATIONS";
pub const ENV_POLL_INTERVAL_MS: &str = "CE_POLL_INTERVAL_MS";
pub const ENV_BATCH_SIZE: &str = "CE_BATCH_SIZE";
pub const ENV_DATA_DIR: &str = "CE_DATA_DIR";
pub const ENV_TOKEN_ADDRESS: &str = "CE_TOKEN_ADDRESS";
pub const ENV_ADMIN_WALLET: &str = "CE_ADMIN_WALLET";
pub const ENV_ARTIFACT_PATH: &str = "CE_ARTIFACT_PATH";

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),

    #[error("Invalid value for {var}: {value:?} ({reason})")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Complete runtime configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeConfig {
    pub ingestion: IngestionConfig,
    /// Directory holding the ledger store and its lock file.
    pub data_dir: PathBuf,
    /// Authoritative address used only when the store has none yet.
    pub token_address: Address,
    /// Owner of every instance a migration deploys.
    pub admin_wallet: Address,
    pub artifact_path: Option<PathBuf>,
}

impl RuntimeConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from any variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = IngestionConfig::default();
        let poll_ms = parse_or(
            &lookup,
            ENV_POLL_INTERVAL_MS,
            defaults.poll_interval.as_millis() as u64,
        )?;

        let config = Self {
            ingestion: IngestionConfig {
                confirmations: parse_or(&lookup, ENV_CONFIRMATIONS, defaults.confirmations)?,
                poll_interval: Duration::from_millis(poll_ms),
                batch_size: parse_or(&lookup, ENV_BATCH_SIZE, defaults.batch_size)?,
            },
            data_dir: lookup(ENV_DATA_DIR)
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./data")),
            token_address: required(&lookup, ENV_TOKEN_ADDRESS)?,
            admin_wallet: required(&lookup, ENV_ADMIN_WALLET)?,
            artifact_path: lookup(ENV_ARTIFACT_PATH)
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
        };

        if poll_ms == 0 {
            return Err(invalid(ENV_POLL_INTERVAL_MS, "0", "must be greater than 0"));
        }
        if config.ingestion.batch_size == 0 {
            return Err(invalid(ENV_BATCH_SIZE, "0", "must be greater than 0"));
        }
        if config.token_address.is_zero() {
            return Err(invalid(
                ENV_TOKEN_ADDRESS,
                &config.token_address.to_string(),
                "zero address",
            ));
        }
        Ok(config)
    }
}

fn invalid(var: &'static str, value: &str, reason: impl ToString) -> ConfigError {
    ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: ToString,
{
    match lookup(var) {
        Some(raw) if !raw.trim().is_empty() => {
            raw.trim().parse().map_err(|e: T::Err| invalid(var, &raw, e))
        }
        _ => Ok(default),
    }
}

fn required<T>(lookup: &impl Fn(&str) -> Option<String>, var: &'static str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: ToString,
{
    let raw = lookup(var)
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing(var))?;
    raw.trim().parse().map_err(|e: T::Err| invalid(var, &raw, e))
}
