//! LoRaWAN device identity material.
//!
//! Identifiers and keys are given as hexadecimal strings (as printed by the
//! network server console) and parsed once at startup into fixed-length
//! byte arrays. Keys are zeroized on drop and never printed.
//!
//! # Example
//!
//! ```
//! use ttgo_lorawan_node::config::{ActivationMode, DeviceIdentity};
//!
//! let identity = DeviceIdentity::abp(
//!     "260B1234",
//!     "000102030405060708090A0B0C0D0E0F",
//!     "F0E0D0C0B0A090807060504030201000",
//! )
//! .unwrap();
//! assert_eq!(identity.mode(), ActivationMode::Abp);
//! ```

use std::fmt;
use std::str::FromStr;
use zeroize::{Zeroize, ZeroizeOnDrop};

pub const EUI_LEN: usize = 8;
pub const DEV_ADDR_LEN: usize = 4;
pub const KEY_LEN: usize = 16;

/// How the device obtains its session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationMode {
    /// Over-the-air activation (join request/accept handshake).
    Otaa,
    /// Activation by personalization (pre-shared session keys).
    Abp,
}

impl ActivationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Otaa => "OTAA",
            Self::Abp => "ABP",
        }
    }
}

impl FromStr for ActivationMode {
    type Err = IdentityError;

    /// Accepts the mode name or the numeric flag used by board makefiles
    /// (`1` = OTAA, `0` = ABP).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "otaa" | "1" | "true" => Ok(Self::Otaa),
            "abp" | "0" | "false" => Ok(Self::Abp),
            _ => Err(IdentityError::UnknownMode(s.to_string())),
        }
    }
}

impl fmt::Display for ActivationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 64-bit extended unique identifier (DevEUI / AppEUI).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Eui(pub [u8; EUI_LEN]);

/// 32-bit device address assigned for ABP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DevAddr(pub [u8; DEV_ADDR_LEN]);

/// AES-128 key (AppKey, AppSKey or NwkSKey).
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct AesKey([u8; KEY_LEN]);

impl AesKey {
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for AesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AesKey(<redacted>)")
    }
}

impl Eui {
    pub fn parse(field: &'static str, hex: &str) -> Result<Self, IdentityError> {
        parse_hex(field, hex).map(Self)
    }
}

impl DevAddr {
    pub fn parse(field: &'static str, hex: &str) -> Result<Self, IdentityError> {
        parse_hex(field, hex).map(Self)
    }
}

impl AesKey {
    pub fn parse(field: &'static str, hex: &str) -> Result<Self, IdentityError> {
        let mut bytes = parse_hex::<KEY_LEN>(field, hex)?;
        let key = Self(bytes);
        bytes.zeroize();
        Ok(key)
    }
}

impl fmt::Display for Eui {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_hex(f, &self.0)
    }
}

impl fmt::Display for DevAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_hex(f, &self.0)
    }
}

fn write_hex(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    for b in bytes {
        write!(f, "{:02X}", b)?;
    }
    Ok(())
}

/// Parse a hex string of exactly `2 * N` digits into `N` bytes.
///
/// Surrounding whitespace is ignored, embedded separators are not.
pub fn parse_hex<const N: usize>(field: &'static str, hex: &str) -> Result<[u8; N], IdentityError> {
    let hex = hex.trim();
    if hex.is_empty() {
        return Err(IdentityError::Missing { field });
    }
    if hex.len() != N * 2 {
        return Err(IdentityError::InvalidLength {
            field,
            expected: N * 2,
            actual: hex.len(),
        });
    }

    let mut out = [0u8; N];
    let digits = hex.as_bytes();
    for (i, byte) in out.iter_mut().enumerate() {
        let hi = hex_digit(digits[2 * i]).ok_or(IdentityError::InvalidHex {
            field,
            position: 2 * i,
        })?;
        let lo = hex_digit(digits[2 * i + 1]).ok_or(IdentityError::InvalidHex {
            field,
            position: 2 * i + 1,
        })?;
        *byte = (hi << 4) | lo;
    }
    Ok(out)
}

fn hex_digit(c: u8) -> Option<u8> {
    (c as char).to_digit(16).map(|d| d as u8)
}

/// Identity material for exactly one activation mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceIdentity {
    Otaa {
        dev_eui: Eui,
        app_eui: Eui,
        app_key: AesKey,
    },
    Abp {
        dev_addr: DevAddr,
        app_skey: AesKey,
        nwk_skey: AesKey,
    },
}

impl DeviceIdentity {
    /// Build an OTAA identity from hex strings.
    pub fn otaa(dev_eui: &str, app_eui: &str, app_key: &str) -> Result<Self, IdentityError> {
        Ok(Self::Otaa {
            dev_eui: Eui::parse("DevEUI", dev_eui)?,
            app_eui: Eui::parse("AppEUI", app_eui)?,
            app_key: AesKey::parse("AppKey", app_key)?,
        })
    }

    /// Build an ABP identity from hex strings.
    pub fn abp(dev_addr: &str, app_skey: &str, nwk_skey: &str) -> Result<Self, IdentityError> {
        Ok(Self::Abp {
            dev_addr: DevAddr::parse("DevAddr", dev_addr)?,
            app_skey: AesKey::parse("AppSKey", app_skey)?,
            nwk_skey: AesKey::parse("NwkSKey", nwk_skey)?,
        })
    }

    pub fn mode(&self) -> ActivationMode {
        match self {
            Self::Otaa { .. } => ActivationMode::Otaa,
            Self::Abp { .. } => ActivationMode::Abp,
        }
    }

    /// Short printable summary without key material.
    pub fn summary(&self) -> String {
        match self {
            Self::Otaa {
                dev_eui, app_eui, ..
            } => format!("OTAA dev_eui={} app_eui={}", dev_eui, app_eui),
            Self::Abp { dev_addr, .. } => format!("ABP dev_addr={}", dev_addr),
        }
    }
}

/// Errors in identity configuration. All of them are fatal at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// Field not configured.
    Missing { field: &'static str },
    /// Wrong number of hex digits.
    InvalidLength {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
    /// Non-hex character at the given offset.
    InvalidHex {
        field: &'static str,
        position: usize,
    },
    /// Unknown activation mode string.
    UnknownMode(String),
}

impl fmt::Display for IdentityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing { field } => write!(f, "{} is not configured", field),
            Self::InvalidLength {
                field,
                expected,
                actual,
            } => write!(
                f,
                "{} must be {} hex digits, got {}",
                field, expected, actual
            ),
            Self::InvalidHex { field, position } => {
                write!(f, "{} has a non-hex character at offset {}", field, position)
            }
            Self::UnknownMode(mode) => {
                write!(f, "unknown activation mode: {} (expected otaa or abp)", mode)
            }
        }
    }
}

impl std::error::Error for IdentityError {}
