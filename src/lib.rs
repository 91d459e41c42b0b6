//! TTGO LoRa32 LoRaWAN node firmware library.
//!
//! Joins a LoRaWAN network (OTAA or ABP) and sends an uplink on a fixed
//! period. Everything here is platform-independent and runs on the host
//! against a simulated stack; the `esp32` feature only changes the binary's
//! platform setup.

pub mod config;
pub mod lora;
pub mod lorawan;
pub mod node;

// Re-export commonly used items
pub use config::{ActivationMode, ConfigError, DeviceIdentity, IdentityError, NodeConfig};
pub use lora::{
    calculate_airtime_us, DataRate, DutyCycleLimiter, LoRaParams, Region,
};
pub use lorawan::{
    ActivationController, RadioSession, RadioStack, SimulatedStack, TokioAlarm, TxOutcome,
    UplinkScheduler, UplinkStats,
};
pub use node::{run_node, run_node_with, NodeError, NodeHandle, NodeOptions};
