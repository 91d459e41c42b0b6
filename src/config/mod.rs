//! Node configuration management.
//!
//! # Components
//!
//! - [`identity`] - LoRaWAN identifiers and keys parsed from hex
//! - [`node`] - Startup configuration (identity, region, data rate, period)
//!
//! Configuration is parsed once before the radio is touched. Any error here
//! is fatal: keys are compiled in and cannot be fixed at runtime.

mod identity;
mod node;

pub use identity::{
    parse_hex, ActivationMode, AesKey, DevAddr, DeviceIdentity, Eui, IdentityError, DEV_ADDR_LEN,
    EUI_LEN, KEY_LEN,
};
pub use node::{
    ConfigError, NodeConfig, DEFAULT_PERIOD_SECS, ENV_ACTIVATION, ENV_APP_EUI, ENV_APP_KEY,
    ENV_APP_SKEY, ENV_DATA_RATE, ENV_DEV_ADDR, ENV_DEV_EUI, ENV_NWK_SKEY, ENV_PERIOD_SECS,
    MAX_PERIOD_SECS, MIN_PERIOD_SECS,
};
