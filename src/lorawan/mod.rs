//! LoRaWAN node control: activation, then periodic uplinks.
//!
//! The radio and MAC live behind [`RadioStack`]. This module owns the
//! control flow around it: [`ActivationController`] joins the network and
//! hands the session to [`UplinkScheduler`], which wakes up on [`Tick`]s
//! from an [`AlarmSource`] and sends one uplink per tick.

pub mod activation;
pub mod alarm;
pub mod scheduler;
pub mod session;
pub mod sim;
pub mod stack;

pub use activation::{
    ActivationConfig, ActivationController, ActivationError, Joined, JOIN_BACKOFF, SETTLE_DELAY,
};
pub use alarm::{
    tick_channel, AlarmCallback, AlarmError, AlarmId, AlarmSource, AlarmToken, Tick, TickReceiver,
    TickSender, TickSource, TokioAlarm,
};
pub use scheduler::{
    CounterPayload, FixedPayload, PayloadSource, SchedulerConfig, SchedulerError,
    SchedulerReport, SchedulerState, StopReason, UplinkScheduler, UplinkStats,
    DEFAULT_COMPLETION_TIMEOUT, DEFAULT_MESSAGE,
};
pub use session::RadioSession;
pub use sim::{SimulatedStack, StackCall, StackLog};
pub use stack::{JoinOutcome, RadioStack, TxMode, TxOutcome};
