//! LoRa time-on-air calculation for LoRaWAN uplinks.
//!
//! Uses the formula from the Semtech SX127x/SX126x datasheets. LoRaWAN
//! uplinks always use explicit header, CRC on and coding rate 4/5, so only
//! spreading factor and bandwidth vary with the data rate.
//!
//! # Example
//!
//! ```
//! use ttgo_lorawan_node::lora::{calculate_airtime_us, lorawan_frame_len, LoRaParams};
//!
//! let params = LoRaParams::uplink(9, 125_000);
//! let airtime = calculate_airtime_us(lorawan_frame_len(13), &params);
//! println!("13-byte uplink takes {} us ({:.2} ms)", airtime, airtime as f64 / 1000.0);
//! ```

/// MHDR (1) + FHDR without options (7) + FPort (1) + MIC (4).
pub const LORAWAN_FRAME_OVERHEAD: usize = 13;

/// LoRa modulation parameters for airtime calculation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoRaParams {
    /// Spreading factor (7-12)
    pub spreading_factor: u8,
    /// Bandwidth in Hz (125000, 250000 or 500000)
    pub bandwidth_hz: u32,
    /// Coding rate denominator (5-8 for 4/5 to 4/8)
    pub coding_rate: u8,
    /// Preamble length in symbols
    pub preamble_symbols: u8,
    /// Whether explicit header mode is used
    pub explicit_header: bool,
    /// Whether CRC is enabled
    pub crc_enabled: bool,
}

impl Default for LoRaParams {
    /// SF7/125kHz uplink.
    fn default() -> Self {
        Self::uplink(7, 125_000)
    }
}

impl LoRaParams {
    /// Uplink parameters as mandated by the LoRaWAN regional parameters.
    pub fn uplink(spreading_factor: u8, bandwidth_hz: u32) -> Self {
        Self {
            spreading_factor,
            bandwidth_hz,
            coding_rate: 5,
            preamble_symbols: 8,
            explicit_header: true,
            crc_enabled: true,
        }
    }

    /// Check if low data rate optimization should be enabled.
    ///
    /// Required when symbol time exceeds 16ms (SF11/SF12 at 125kHz).
    pub fn low_data_rate_optimize(&self) -> bool {
        self.symbol_duration_us() > 16_000
    }

    /// Calculate symbol duration in microseconds.
    pub fn symbol_duration_us(&self) -> u64 {
        let sf = self.spreading_factor as u64;
        let bw = self.bandwidth_hz as u64;
        if bw == 0 {
            return 0;
        }
        (1u64 << sf) * 1_000_000 / bw
    }
}

/// Size of the PHY payload carrying `app_payload_len` application bytes.
pub fn lorawan_frame_len(app_payload_len: usize) -> usize {
    app_payload_len + LORAWAN_FRAME_OVERHEAD
}

/// Calculate LoRa packet airtime in microseconds.
///
/// `payload_bytes` is the PHY payload size, see [`lorawan_frame_len`].
pub fn calculate_airtime_us(payload_bytes: usize, params: &LoRaParams) -> u64 {
    let sf = params.spreading_factor as f64;
    let bw = params.bandwidth_hz as f64;

    if bw == 0.0 {
        return 0;
    }

    let t_sym_us = (2.0_f64.powf(sf) / bw) * 1_000_000.0;

    // Preamble: (n_preamble + 4.25) symbols
    let preamble = params.preamble_symbols as f64;
    let t_preamble_us = (preamble + 4.25) * t_sym_us;

    let de = if params.low_data_rate_optimize() {
        1.0
    } else {
        0.0
    };
    let h = if params.explicit_header { 0.0 } else { 1.0 };
    let crc_bits = if params.crc_enabled { 16.0 } else { 0.0 };

    // 8*PL - 4*SF + 28 + 16*CRC - 20*H
    let pl = payload_bytes as f64;
    let numerator = 8.0 * pl - 4.0 * sf + 28.0 + crc_bits - 20.0 * h;
    let denominator = 4.0 * (sf - 2.0 * de);

    let cr = params.coding_rate as f64;
    let payload_symbols = if denominator > 0.0 {
        8.0 + (numerator / denominator).ceil().max(0.0) * cr
    } else {
        8.0
    };

    let t_payload_us = payload_symbols * t_sym_us;

    (t_preamble_us + t_payload_us).round() as u64
}
