//! Node runner: activation followed by the uplink scheduler.
//!
//! The calling task performs the join (retrying as long as it takes), then
//! spawns the scheduler on its own task and returns a [`NodeHandle`].
//!
//! # Example
//!
//! ```ignore
//! let config = NodeConfig::from_env()?;
//! let stack = SimulatedStack::new();
//! let handle = run_node(config, stack, TokioAlarm::new(), CounterPayload::default()).await?;
//! handle.trigger();
//! let report = handle.shutdown().await?;
//! ```

use crate::config::NodeConfig;
use crate::lorawan::{
    ActivationConfig, ActivationController, ActivationError, AlarmSource, PayloadSource,
    RadioSession, RadioStack, SchedulerConfig, SchedulerError, SchedulerReport, SchedulerState,
    TickSender, UplinkScheduler,
};
use log::info;
use std::fmt;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Error type for node operations.
#[derive(Debug)]
pub enum NodeError {
    /// Join gave up (only with a bounded attempt count).
    Activation(ActivationError),
    /// The scheduler stopped on an error.
    Scheduler(SchedulerError),
    /// The scheduler task panicked or was aborted.
    TaskFailed(String),
}

impl fmt::Display for NodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Activation(e) => write!(f, "activation failed: {}", e),
            Self::Scheduler(e) => write!(f, "scheduler failed: {}", e),
            Self::TaskFailed(msg) => write!(f, "scheduler task failed: {}", msg),
        }
    }
}

impl std::error::Error for NodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Activation(e) => Some(e),
            Self::Scheduler(e) => Some(e),
            Self::TaskFailed(_) => None,
        }
    }
}

impl From<ActivationError> for NodeError {
    fn from(e: ActivationError) -> Self {
        Self::Activation(e)
    }
}

impl From<SchedulerError> for NodeError {
    fn from(e: SchedulerError) -> Self {
        Self::Scheduler(e)
    }
}

/// Everything besides the node configuration needed to run a node.
#[derive(Debug, Clone)]
pub struct NodeOptions {
    pub activation: ActivationConfig,
    pub scheduler: SchedulerConfig,
}

impl NodeOptions {
    /// Defaults for the region and data rate in `config`.
    pub fn for_config(config: &NodeConfig) -> Self {
        Self {
            activation: ActivationConfig::new(config.data_rate),
            scheduler: SchedulerConfig::new(config.region, config.data_rate),
        }
    }
}

/// A running scheduler task.
pub struct NodeHandle<S: RadioStack> {
    task: JoinHandle<Result<SchedulerReport<S>, SchedulerError>>,
    ticks: TickSender,
    state: watch::Receiver<SchedulerState>,
    cancel: CancellationToken,
    period: Duration,
}

impl<S: RadioStack> NodeHandle<S> {
    /// Ask for an uplink now instead of waiting for the alarm.
    pub fn trigger(&self) -> bool {
        self.ticks.trigger()
    }

    pub fn tick_sender(&self) -> TickSender {
        self.ticks.clone()
    }

    /// Current scheduler state.
    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    /// Receiver notified on every scheduler state change.
    pub fn state_watch(&self) -> watch::Receiver<SchedulerState> {
        self.state.clone()
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Wait for the scheduler to stop on its own.
    pub async fn join(self) -> Result<SchedulerReport<S>, NodeError> {
        let report = self
            .task
            .await
            .map_err(|e| NodeError::TaskFailed(e.to_string()))??;
        Ok(report)
    }

    /// Stop the scheduler between cycles and wait for it.
    pub async fn shutdown(self) -> Result<SchedulerReport<S>, NodeError> {
        self.cancel.cancel();
        self.join().await
    }
}

/// Activate with default options, then start uplinks.
pub async fn run_node<S, A, P>(
    config: NodeConfig,
    stack: S,
    alarm: A,
    payload: P,
) -> Result<NodeHandle<S>, NodeError>
where
    S: RadioStack,
    A: AlarmSource,
    P: PayloadSource,
{
    let options = NodeOptions::for_config(&config);
    run_node_with(config, options, stack, alarm, payload).await
}

/// Activate, then spawn the uplink scheduler.
///
/// Returns once the join has succeeded; the scheduler keeps running on
/// its own task until the handle is shut down.
pub async fn run_node_with<S, A, P>(
    config: NodeConfig,
    options: NodeOptions,
    stack: S,
    alarm: A,
    payload: P,
) -> Result<NodeHandle<S>, NodeError>
where
    S: RadioStack,
    A: AlarmSource,
    P: PayloadSource,
{
    info!(
        "Region {} ({:.1} MHz), data rate {}, uplink period {}s",
        config.region,
        config.region.frequency() as f64 / 1_000_000.0,
        config.data_rate,
        config.period.as_secs()
    );
    info!("Identity: {}", config.identity.summary());

    let session = RadioSession::new(stack);
    let joined = ActivationController::new(session, config.identity, options.activation)
        .activate()
        .await?;

    let scheduler = UplinkScheduler::new(joined, alarm, payload, options.scheduler);
    let ticks = scheduler.tick_sender();
    let state = scheduler.state_watch();
    let cancel = CancellationToken::new();
    let task = tokio::spawn(scheduler.start(config.period, cancel.clone()));

    Ok(NodeHandle {
        task,
        ticks,
        state,
        cancel,
        period: config.period,
    })
}
