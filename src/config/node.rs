//! Startup configuration for the node.
//!
//! Values come from environment variables. They are baked in at compile time
//! (`option_env!`), which is how firmware images carry their keys, and on
//! host builds the runtime environment can override them.
//!
//! | Variable | Meaning |
//! |----------|---------|
//! | `LORAWAN_ACTIVATION` | `otaa` (default) or `abp`, `1`/`0` also accepted |
//! | `LORAWAN_DEV_EUI`, `LORAWAN_APP_EUI`, `LORAWAN_APP_KEY` | OTAA identity |
//! | `LORAWAN_DEV_ADDR`, `LORAWAN_APP_SKEY`, `LORAWAN_NWK_SKEY` | ABP identity |
//! | `LORAWAN_PERIOD_SECS` | Uplink period, default 20, at most 86400 |
//! | `LORAWAN_DATA_RATE` | Data rate index, default is the region default |

use super::identity::{ActivationMode, DeviceIdentity, IdentityError};
use crate::lora::{DataRate, Region};
use std::fmt;
use std::time::Duration;

pub const ENV_ACTIVATION: &str = "LORAWAN_ACTIVATION";
pub const ENV_DEV_EUI: &str = "LORAWAN_DEV_EUI";
pub const ENV_APP_EUI: &str = "LORAWAN_APP_EUI";
pub const ENV_APP_KEY: &str = "LORAWAN_APP_KEY";
pub const ENV_DEV_ADDR: &str = "LORAWAN_DEV_ADDR";
pub const ENV_APP_SKEY: &str = "LORAWAN_APP_SKEY";
pub const ENV_NWK_SKEY: &str = "LORAWAN_NWK_SKEY";
pub const ENV_PERIOD_SECS: &str = "LORAWAN_PERIOD_SECS";
pub const ENV_DATA_RATE: &str = "LORAWAN_DATA_RATE";

/// Uplink period. 20s keeps a short uplink inside the per-channel duty
/// cycle when the stack rotates over the default channels.
pub const DEFAULT_PERIOD_SECS: u64 = 20;

/// Shortest accepted uplink period.
pub const MIN_PERIOD_SECS: u64 = 1;

/// Longest accepted uplink period (one day).
pub const MAX_PERIOD_SECS: u64 = 24 * 60 * 60;

/// Everything the node needs before the radio is touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeConfig {
    pub identity: DeviceIdentity,
    pub region: Region,
    pub data_rate: DataRate,
    pub period: Duration,
}

impl NodeConfig {
    /// Build a configuration from a key lookup function.
    ///
    /// Only the fields of the selected activation mode are read.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mode = match lookup(ENV_ACTIVATION) {
            Some(value) => value.parse::<ActivationMode>()?,
            None => ActivationMode::Otaa,
        };

        let field = |key: &str| lookup(key).unwrap_or_default();
        let identity = match mode {
            ActivationMode::Otaa => DeviceIdentity::otaa(
                &field(ENV_DEV_EUI),
                &field(ENV_APP_EUI),
                &field(ENV_APP_KEY),
            )?,
            ActivationMode::Abp => DeviceIdentity::abp(
                &field(ENV_DEV_ADDR),
                &field(ENV_APP_SKEY),
                &field(ENV_NWK_SKEY),
            )?,
        };

        let region = Region::default();

        let data_rate = match lookup(ENV_DATA_RATE) {
            Some(value) => parse_data_rate(&value)?,
            None => region.default_data_rate(),
        };
        if !region.supports(data_rate) {
            return Err(ConfigError::UnsupportedDataRate { region, data_rate });
        }

        let period = match lookup(ENV_PERIOD_SECS) {
            Some(value) => parse_period(&value)?,
            None => Duration::from_secs(DEFAULT_PERIOD_SECS),
        };

        Ok(Self {
            identity,
            region,
            data_rate,
            period,
        })
    }

    /// Configuration baked into the binary at compile time.
    pub fn compiled() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| compiled_value(key).map(str::to_string))
    }

    /// Runtime environment first, compiled-in values as fallback.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| {
            std::env::var(key)
                .ok()
                .or_else(|| compiled_value(key).map(str::to_string))
        })
    }
}

fn compiled_value(key: &str) -> Option<&'static str> {
    match key {
        ENV_ACTIVATION => option_env!("LORAWAN_ACTIVATION"),
        ENV_DEV_EUI => option_env!("LORAWAN_DEV_EUI"),
        ENV_APP_EUI => option_env!("LORAWAN_APP_EUI"),
        ENV_APP_KEY => option_env!("LORAWAN_APP_KEY"),
        ENV_DEV_ADDR => option_env!("LORAWAN_DEV_ADDR"),
        ENV_APP_SKEY => option_env!("LORAWAN_APP_SKEY"),
        ENV_NWK_SKEY => option_env!("LORAWAN_NWK_SKEY"),
        ENV_PERIOD_SECS => option_env!("LORAWAN_PERIOD_SECS"),
        ENV_DATA_RATE => option_env!("LORAWAN_DATA_RATE"),
        _ => None,
    }
}

fn parse_period(value: &str) -> Result<Duration, ConfigError> {
    let secs: u64 = value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidPeriod(value.to_string()))?;
    if !(MIN_PERIOD_SECS..=MAX_PERIOD_SECS).contains(&secs) {
        return Err(ConfigError::InvalidPeriod(value.to_string()));
    }
    Ok(Duration::from_secs(secs))
}

fn parse_data_rate(value: &str) -> Result<DataRate, ConfigError> {
    let trimmed = value.trim();
    let digits = trimmed
        .strip_prefix("DR")
        .or_else(|| trimmed.strip_prefix("dr"))
        .unwrap_or(trimmed);
    digits
        .parse::<u8>()
        .map(DataRate)
        .map_err(|_| ConfigError::InvalidDataRate(value.to_string()))
}

/// Errors that can occur while loading the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Malformed or missing identity material.
    Identity(IdentityError),
    /// Period is not a whole number of seconds between 1 and one day.
    InvalidPeriod(String),
    /// Data rate is not a number.
    InvalidDataRate(String),
    /// Data rate has no LoRa modulation in the selected region.
    UnsupportedDataRate { region: Region, data_rate: DataRate },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identity(e) => write!(f, "identity: {}", e),
            Self::InvalidPeriod(v) => write!(f, "invalid uplink period: {}", v),
            Self::InvalidDataRate(v) => write!(f, "invalid data rate: {}", v),
            Self::UnsupportedDataRate { region, data_rate } => {
                write!(f, "{} is not available in {}", data_rate, region)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Identity(e) => Some(e),
            _ => None,
        }
    }
}

impl From<IdentityError> for ConfigError {
    fn from(e: IdentityError) -> Self {
        Self::Identity(e)
    }
}
