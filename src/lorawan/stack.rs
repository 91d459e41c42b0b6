//! Interface to the LoRaWAN stack.
//!
//! The MAC/PHY implementation is provided by the platform; the controller
//! only drives it through [`RadioStack`]. `join`, `send` and
//! `await_completion` suspend the calling task until the stack is done.

use crate::config::{ActivationMode, AesKey, DevAddr, Eui};
use crate::lora::DataRate;
use std::fmt;
use std::future::Future;

/// Whether uplinks ask the network for an acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxMode {
    Unconfirmed,
    Confirmed,
}

/// Result of a join attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    Succeeded,
    Failed,
}

/// Result of an uplink request, as reported by the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxOutcome {
    /// Frame transmitted.
    Ok,
    /// Stack reported a transmission error.
    Error,
    /// Stack is still busy with a previous operation.
    Busy,
    /// Stack has no active session.
    NotJoined,
    /// Stack queued the frame for later (duty cycle).
    Scheduled,
}

impl TxOutcome {
    /// Status line for the log.
    pub fn describe(self) -> &'static str {
        match self {
            Self::Ok => "LoRaWAN TX OK",
            Self::Error => "LoRaWAN TX failed",
            Self::Busy => "LoRaWAN stack busy",
            Self::NotJoined => "LoRaWAN stack not joined",
            Self::Scheduled => "LoRaWAN TX scheduled",
        }
    }
}

impl fmt::Display for TxOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// LoRaWAN stack adapter.
///
/// Implementations are not expected to be reentrant: the controller never
/// has more than one `join` or `send` outstanding.
pub trait RadioStack: Send + 'static {
    /// Bring the stack to its initial state.
    fn initialize(&mut self);

    fn set_tx_mode(&mut self, mode: TxMode);

    fn set_data_rate(&mut self, data_rate: DataRate);

    fn set_otaa_identity(&mut self, dev_eui: &Eui, app_eui: &Eui, app_key: &AesKey);

    fn set_abp_identity(&mut self, dev_addr: &DevAddr, app_skey: &AesKey, nwk_skey: &AesKey);

    /// Run the join procedure for `mode` (a no-op handshake for ABP).
    fn join(&mut self, mode: ActivationMode) -> impl Future<Output = JoinOutcome> + Send;

    /// Transmit one uplink.
    fn send(&mut self, payload: &[u8]) -> impl Future<Output = TxOutcome> + Send;

    /// Wait until the TX/RX-window cycle started by `send` has finished.
    fn await_completion(&mut self) -> impl Future<Output = ()> + Send;
}
