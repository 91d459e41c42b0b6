//! Network activation: configure the stack, then join until it succeeds.
//!
//! # Retry Policy
//!
//! A failed join is treated as transient. The controller sleeps a fixed
//! backoff and tries again, forever by default: an unattended field device
//! has nobody to restart it, and the next attempt may well find a gateway.
//! The backoff also keeps join requests within the duty cycle.
//!
//! [`ActivationConfig::max_attempts`] bounds the loop for tests and
//! supervised deployments.

use super::session::RadioSession;
use super::stack::{JoinOutcome, RadioStack, TxMode};
use crate::config::{ActivationMode, DeviceIdentity};
use crate::lora::DataRate;
use log::{info, warn};
use std::fmt;
use std::time::Duration;

/// Delay between failed join attempts.
pub const JOIN_BACKOFF: Duration = Duration::from_secs(60);

/// Delay after a successful join before the first uplink is scheduled,
/// so the stack can finish setting up its session state.
pub const SETTLE_DELAY: Duration = Duration::from_secs(4);

/// Parameters of the activation procedure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationConfig {
    pub tx_mode: TxMode,
    pub data_rate: DataRate,
    pub backoff: Duration,
    pub settle: Duration,
    /// `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl ActivationConfig {
    pub fn new(data_rate: DataRate) -> Self {
        Self {
            tx_mode: TxMode::Unconfirmed,
            data_rate,
            backoff: JOIN_BACKOFF,
            settle: SETTLE_DELAY,
            max_attempts: None,
        }
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }
}

/// A joined session, ready for uplinks.
pub struct Joined<S: RadioStack> {
    pub session: RadioSession<S>,
    pub mode: ActivationMode,
    /// Join attempts it took, including the successful one.
    pub attempts: u32,
}

/// Errors that end activation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationError {
    /// The configured attempt ceiling was reached without joining.
    RetriesExhausted { attempts: u32 },
}

impl fmt::Display for ActivationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RetriesExhausted { attempts } => {
                write!(f, "join failed after {} attempts", attempts)
            }
        }
    }
}

impl std::error::Error for ActivationError {}

/// Drives the join state machine to completion.
pub struct ActivationController<S: RadioStack> {
    session: RadioSession<S>,
    identity: DeviceIdentity,
    config: ActivationConfig,
}

impl<S: RadioStack> ActivationController<S> {
    pub fn new(
        session: RadioSession<S>,
        identity: DeviceIdentity,
        config: ActivationConfig,
    ) -> Self {
        Self {
            session,
            identity,
            config,
        }
    }

    /// Configure the stack and join the network.
    ///
    /// Returns only once joined, unless `max_attempts` is set.
    pub async fn activate(mut self) -> Result<Joined<S>, ActivationError> {
        let mode = self.identity.mode();
        info!("Node activation by: {}", mode);

        self.configure();

        let mut attempts = 0u32;
        loop {
            attempts += 1;
            info!("Starting {} join procedure (attempt {})", mode, attempts);

            match self.session.stack_mut().join(mode).await {
                JoinOutcome::Succeeded => break,
                JoinOutcome::Failed => {
                    warn!("Join procedure failed");
                }
            }

            if let Some(max) = self.config.max_attempts {
                if attempts >= max {
                    warn!("Giving up after {} join attempts", attempts);
                    return Err(ActivationError::RetriesExhausted { attempts });
                }
            }

            info!(
                "Join failed, sleeping {}s before retrying",
                self.config.backoff.as_secs()
            );
            tokio::time::sleep(self.config.backoff).await;
        }

        info!("{} activation succeeded after {} attempt(s)", mode, attempts);
        tokio::time::sleep(self.config.settle).await;

        Ok(Joined {
            session: self.session,
            mode,
            attempts,
        })
    }

    fn configure(&mut self) {
        let stack = self.session.stack_mut();
        stack.set_tx_mode(self.config.tx_mode);
        stack.set_data_rate(self.config.data_rate);

        match &self.identity {
            DeviceIdentity::Otaa {
                dev_eui,
                app_eui,
                app_key,
            } => {
                info!("Set OTAA identity: dev_eui={} app_eui={}", dev_eui, app_eui);
                stack.set_otaa_identity(dev_eui, app_eui, app_key);
            }
            DeviceIdentity::Abp {
                dev_addr,
                app_skey,
                nwk_skey,
            } => {
                info!("Set ABP identity: dev_addr={}", dev_addr);
                stack.set_abp_identity(dev_addr, app_skey, nwk_skey);
            }
        }
    }
}
