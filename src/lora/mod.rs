//! LoRa radio parameters shared by the controller.
//!
//! This module contains:
//! - [`config`]: Region configuration and the LoRaWAN data rate tables
//! - [`duty_cycle`]: Duty cycle limiter for regulatory compliance
//! - [`airtime`]: Time-on-air calculation for LoRaWAN uplinks

mod airtime;
mod config;
mod duty_cycle;

pub use airtime::{
    calculate_airtime_us, lorawan_frame_len, LoRaParams, LORAWAN_FRAME_OVERHEAD,
};
pub use config::{DataRate, Region};
pub use duty_cycle::DutyCycleLimiter;
