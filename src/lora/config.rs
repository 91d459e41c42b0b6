//! LoRaWAN region configuration.
//!
//! Region-specific settings: operating frequency, duty cycle budget and the
//! data rate table mapping a LoRaWAN DR index to spreading factor and
//! bandwidth (LoRaWAN Regional Parameters, LoRa data rates only).

use super::{DutyCycleLimiter, LoRaParams};
use std::fmt;
use std::time::Duration;

/// Frequency band region.
///
/// Determines the operating frequency, duty cycle limits and the data rate
/// table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    /// EU 863-870 MHz band (1% duty cycle)
    Eu868,
    /// US 902-928 MHz band (more relaxed duty cycle)
    Us915,
    /// Australia 915-928 MHz
    Au915,
    /// Asia 920-923 MHz
    As923,
}

/// LoRaWAN data rate index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct DataRate(pub u8);

impl DataRate {
    pub const DR0: Self = Self(0);
    pub const DR1: Self = Self(1);
    pub const DR2: Self = Self(2);
    pub const DR3: Self = Self(3);
    pub const DR4: Self = Self(4);
    pub const DR5: Self = Self(5);
    pub const DR6: Self = Self(6);
}

impl fmt::Display for DataRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DR{}", self.0)
    }
}

impl Region {
    /// Get the first default channel frequency for this region in Hz.
    pub fn frequency(self) -> u32 {
        match self {
            Self::Eu868 => 868_100_000,
            Self::Us915 => 902_300_000,
            Self::Au915 => 915_200_000,
            Self::As923 => 923_200_000,
        }
    }

    /// Get the duty cycle limit for this region (percentage).
    pub fn duty_cycle_percent(self) -> f32 {
        match self {
            Self::Eu868 => 1.0,
            Self::Us915 => 10.0,
            Self::Au915 => 10.0,
            Self::As923 => 1.0,
        }
    }

    /// Create a duty cycle limiter for this region.
    ///
    /// Uses a 1-hour window for duty cycle calculation.
    pub fn duty_cycle_limiter(self) -> DutyCycleLimiter {
        DutyCycleLimiter::new(self.duty_cycle_percent(), Duration::from_secs(3600))
    }

    /// Data rate used when nothing else is configured.
    ///
    /// DR3 is fast enough for short payloads while keeping a usable range
    /// (SF9/125kHz in EU868, SF7/125kHz in US915).
    pub fn default_data_rate(self) -> DataRate {
        DataRate::DR3
    }

    /// Modulation parameters for an uplink at `dr`.
    ///
    /// Returns `None` if the region has no LoRa modulation for that index.
    pub fn uplink_params(self, dr: DataRate) -> Option<LoRaParams> {
        let (sf, bw) = match (self, dr.0) {
            (Self::Eu868 | Self::As923, 0..=5) => (12 - dr.0, 125_000),
            (Self::Eu868 | Self::As923, 6) => (7, 250_000),
            (Self::Us915, 0..=3) => (10 - dr.0, 125_000),
            (Self::Us915, 4) => (8, 500_000),
            (Self::Au915, 0..=5) => (12 - dr.0, 125_000),
            (Self::Au915, 6) => (8, 500_000),
            _ => return None,
        };
        Some(LoRaParams::uplink(sf, bw))
    }

    /// Check that `dr` is a valid uplink data rate in this region.
    pub fn supports(self, dr: DataRate) -> bool {
        self.uplink_params(dr).is_some()
    }
}

impl Default for Region {
    fn default() -> Self {
        #[cfg(feature = "region-us915")]
        return Self::Us915;
        #[cfg(feature = "region-au915")]
        return Self::Au915;
        #[cfg(feature = "region-as923")]
        return Self::As923;
        #[cfg(not(any(
            feature = "region-us915",
            feature = "region-au915",
            feature = "region-as923"
        )))]
        Self::Eu868
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Eu868 => "EU868",
            Self::Us915 => "US915",
            Self::Au915 => "AU915",
            Self::As923 => "AS923",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_frequencies() {
        assert_eq!(Region::Eu868.frequency(), 868_100_000);
        assert_eq!(Region::Us915.frequency(), 902_300_000);
        assert_eq!(Region::As923.frequency(), 923_200_000);
    }

    #[test]
    fn test_region_duty_cycle_limiter() {
        // 1% of 1 hour = 36 seconds
        assert_eq!(Region::Eu868.duty_cycle_limiter().budget(), 36_000_000);
        assert_eq!(Region::Us915.duty_cycle_limiter().budget(), 360_000_000);
    }

    #[test]
    fn test_eu868_data_rates() {
        let dr0 = Region::Eu868.uplink_params(DataRate::DR0).unwrap();
        assert_eq!((dr0.spreading_factor, dr0.bandwidth_hz), (12, 125_000));

        let dr3 = Region::Eu868.uplink_params(DataRate::DR3).unwrap();
        assert_eq!((dr3.spreading_factor, dr3.bandwidth_hz), (9, 125_000));

        let dr6 = Region::Eu868.uplink_params(DataRate::DR6).unwrap();
        assert_eq!((dr6.spreading_factor, dr6.bandwidth_hz), (7, 250_000));

        assert!(!Region::Eu868.supports(DataRate(7)));
    }

    #[test]
    fn test_us915_data_rates() {
        let dr3 = Region::Us915.uplink_params(DataRate::DR3).unwrap();
        assert_eq!((dr3.spreading_factor, dr3.bandwidth_hz), (7, 125_000));

        let dr4 = Region::Us915.uplink_params(DataRate::DR4).unwrap();
        assert_eq!((dr4.spreading_factor, dr4.bandwidth_hz), (8, 500_000));

        assert!(!Region::Us915.supports(DataRate::DR5));
    }

    #[test]
    fn test_default_data_rate_is_supported_everywhere() {
        for region in [Region::Eu868, Region::Us915, Region::Au915, Region::As923] {
            assert!(region.supports(region.default_data_rate()), "{}", region);
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(Region::Eu868.to_string(), "EU868");
        assert_eq!(DataRate::DR3.to_string(), "DR3");
    }

    #[cfg(not(any(
        feature = "region-us915",
        feature = "region-au915",
        feature = "region-as923"
    )))]
    #[test]
    fn test_default_region() {
        assert_eq!(Region::default(), Region::Eu868);
    }
}
