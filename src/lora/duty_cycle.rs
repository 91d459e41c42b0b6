//! Regional airtime budget for uplinks.
//!
//! A region allows a fraction of every window to be spent transmitting.
//! The limiter holds that allowance in microseconds of airtime, charges
//! each uplink against it and earns it back linearly as the window
//! elapses, so a node may send a few frames back to back as long as the
//! long-run average stays within the regional limit.
//!
//! The clock is `tokio::time`, which makes a paused test runtime drive
//! the refill.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use ttgo_lorawan_node::lora::DutyCycleLimiter;
//!
//! // EU868: 1% of every hour, i.e. 36s of airtime
//! let mut limiter = DutyCycleLimiter::new(1.0, Duration::from_secs(3600));
//!
//! let airtime_us = 205_824; // 13-byte uplink at DR3
//! if limiter.try_consume(airtime_us) {
//!     println!("Uplink allowed");
//! } else {
//!     println!("Duty cycle exceeded, uplink skipped");
//! }
//! ```

use std::time::Duration;
use tokio::time::Instant;

/// Airtime allowance for one region.
///
/// EU868 allows 1% per hour. US915 has dwell-time rules rather than a duty
/// cycle; it is budgeted at 10% here.
#[derive(Debug)]
pub struct DutyCycleLimiter {
    /// Airtime earned over a full window.
    capacity_us: u64,
    /// Airtime that can be spent right now.
    available_us: u64,
    /// When `available_us` was last topped up.
    topped_up_at: Instant,
    window: Duration,
}

impl DutyCycleLimiter {
    /// `percent` of every `window` may be spent on air (1.0 means 1%).
    pub fn new(percent: f32, window: Duration) -> Self {
        let capacity_us = (window.as_micros() as f64 * percent as f64 / 100.0) as u64;
        Self {
            capacity_us,
            available_us: capacity_us,
            topped_up_at: Instant::now(),
            window,
        }
    }

    /// Charge one uplink. Nothing is charged when the allowance is short.
    pub fn try_consume(&mut self, airtime_us: u64) -> bool {
        self.top_up();
        match self.available_us.checked_sub(airtime_us) {
            Some(left) => {
                self.available_us = left;
                true
            }
            None => false,
        }
    }

    /// Airtime that can be spent right now, in microseconds.
    pub fn remaining(&mut self) -> u64 {
        self.top_up();
        self.available_us
    }

    /// Share of the full allowance still available, 0 to 100.
    pub fn remaining_percent(&mut self) -> f32 {
        self.top_up();
        if self.capacity_us == 0 {
            return 0.0;
        }
        (self.available_us as f64 * 100.0 / self.capacity_us as f64) as f32
    }

    /// Airtime earned over a full window, in microseconds.
    pub fn budget(&self) -> u64 {
        self.capacity_us
    }

    /// How long until an uplink of `airtime_us` fits.
    ///
    /// `None` when it is longer than the whole allowance and never fits.
    pub fn time_until_available(&mut self, airtime_us: u64) -> Option<Duration> {
        self.top_up();
        if airtime_us > self.capacity_us {
            return None;
        }
        let Some(short) = airtime_us.checked_sub(self.available_us) else {
            return Some(Duration::ZERO);
        };
        // Round up so the allowance is there once the wait is over
        let wait_us = (short as u128 * self.window.as_micros()).div_ceil(self.capacity_us as u128);
        Some(Duration::from_micros(wait_us as u64))
    }

    fn top_up(&mut self) {
        let window_us = self.window.as_micros();
        if window_us == 0 {
            return;
        }
        let now = Instant::now();
        let since = now.duration_since(self.topped_up_at).as_micros();
        let earned = (self.capacity_us as u128 * since / window_us) as u64;
        // Keep the old timestamp until a whole microsecond has been earned
        if earned == 0 {
            return;
        }
        self.available_us = self.available_us.saturating_add(earned).min(self.capacity_us);
        self.topped_up_at = now;
    }
}
