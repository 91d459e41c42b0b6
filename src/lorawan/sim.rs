//! Simulated LoRaWAN stack for host runs and tests.
//!
//! Join and send results come from scripts (defaulting to success once a
//! script runs dry) and every call is recorded with its timestamp, so the
//! controller's behaviour can be checked against the tokio clock.
//!
//! # Example
//!
//! ```
//! use ttgo_lorawan_node::lorawan::{JoinOutcome, SimulatedStack};
//! use std::time::Duration;
//!
//! let stack = SimulatedStack::new()
//!     .with_join_outcomes([JoinOutcome::Failed, JoinOutcome::Succeeded])
//!     .with_send_latency(Duration::from_millis(200));
//! let log = stack.log();
//! assert_eq!(log.join_count(), 0);
//! ```

use super::stack::{JoinOutcome, RadioStack, TxMode, TxOutcome};
use crate::config::{ActivationMode, AesKey, DevAddr, Eui};
use crate::lora::DataRate;
use log::{debug, info};
use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

/// A call made into the simulated stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackCall {
    Initialize,
    SetTxMode(TxMode),
    SetDataRate(DataRate),
    SetOtaaIdentity { dev_eui: Eui, app_eui: Eui },
    SetAbpIdentity { dev_addr: DevAddr },
    Join(ActivationMode),
    Send(Vec<u8>),
    AwaitCompletion,
}

#[derive(Debug, Default)]
struct Record {
    calls: Vec<(Instant, StackCall)>,
    max_in_flight: usize,
}

/// Shared view on what the simulated stack has been asked to do.
#[derive(Debug, Clone, Default)]
pub struct StackLog {
    record: Arc<Mutex<Record>>,
    in_flight: Arc<AtomicUsize>,
}

impl StackLog {
    fn lock(&self) -> MutexGuard<'_, Record> {
        // A panicking test thread must not hide the recorded calls
        match self.record.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn push(&self, call: StackCall) {
        self.lock().calls.push((Instant::now(), call));
    }

    fn enter(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let mut record = self.lock();
        record.max_in_flight = record.max_in_flight.max(now);
    }

    fn leave(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    /// All calls in order.
    pub fn calls(&self) -> Vec<StackCall> {
        self.lock().calls.iter().map(|(_, c)| c.clone()).collect()
    }

    /// Start times of the calls matching `pred`.
    pub fn times_of(&self, pred: impl Fn(&StackCall) -> bool) -> Vec<Instant> {
        self.lock()
            .calls
            .iter()
            .filter(|(_, c)| pred(c))
            .map(|(t, _)| *t)
            .collect()
    }

    pub fn join_times(&self) -> Vec<Instant> {
        self.times_of(|c| matches!(c, StackCall::Join(_)))
    }

    pub fn send_times(&self) -> Vec<Instant> {
        self.times_of(|c| matches!(c, StackCall::Send(_)))
    }

    pub fn join_count(&self) -> usize {
        self.join_times().len()
    }

    pub fn send_count(&self) -> usize {
        self.send_times().len()
    }

    pub fn completion_count(&self) -> usize {
        self.times_of(|c| matches!(c, StackCall::AwaitCompletion)).len()
    }

    /// Highest number of concurrent `join`/`send` calls seen.
    pub fn max_in_flight(&self) -> usize {
        self.lock().max_in_flight
    }
}

/// Scripted stand-in for a LoRaWAN stack.
#[derive(Debug, Default)]
pub struct SimulatedStack {
    join_script: VecDeque<JoinOutcome>,
    send_script: VecDeque<TxOutcome>,
    join_latency: Duration,
    send_latency: Duration,
    completion_latency: Duration,
    log: StackLog,
}

impl SimulatedStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Outcomes returned by successive joins. `Succeeded` afterwards.
    pub fn with_join_outcomes(mut self, outcomes: impl IntoIterator<Item = JoinOutcome>) -> Self {
        self.join_script.extend(outcomes);
        self
    }

    /// Outcomes returned by successive sends. `Ok` afterwards.
    pub fn with_send_outcomes(mut self, outcomes: impl IntoIterator<Item = TxOutcome>) -> Self {
        self.send_script.extend(outcomes);
        self
    }

    pub fn with_join_latency(mut self, latency: Duration) -> Self {
        self.join_latency = latency;
        self
    }

    pub fn with_send_latency(mut self, latency: Duration) -> Self {
        self.send_latency = latency;
        self
    }

    /// Time between the end of `send` and the end of the RX windows.
    pub fn with_completion_latency(mut self, latency: Duration) -> Self {
        self.completion_latency = latency;
        self
    }

    /// Handle on the call log; stays valid after the stack is moved.
    pub fn log(&self) -> StackLog {
        self.log.clone()
    }
}

impl RadioStack for SimulatedStack {
    fn initialize(&mut self) {
        self.log.push(StackCall::Initialize);
    }

    fn set_tx_mode(&mut self, mode: TxMode) {
        self.log.push(StackCall::SetTxMode(mode));
    }

    fn set_data_rate(&mut self, data_rate: DataRate) {
        self.log.push(StackCall::SetDataRate(data_rate));
    }

    fn set_otaa_identity(&mut self, dev_eui: &Eui, app_eui: &Eui, _app_key: &AesKey) {
        self.log.push(StackCall::SetOtaaIdentity {
            dev_eui: *dev_eui,
            app_eui: *app_eui,
        });
    }

    fn set_abp_identity(&mut self, dev_addr: &DevAddr, _app_skey: &AesKey, _nwk_skey: &AesKey) {
        self.log
            .push(StackCall::SetAbpIdentity { dev_addr: *dev_addr });
    }

    fn join(&mut self, mode: ActivationMode) -> impl Future<Output = JoinOutcome> + Send {
        async move {
            self.log.push(StackCall::Join(mode));
            self.log.enter();
            if !self.join_latency.is_zero() {
                tokio::time::sleep(self.join_latency).await;
            }
            let outcome = self.join_script.pop_front().unwrap_or(JoinOutcome::Succeeded);
            self.log.leave();
            debug!("Simulated {} join: {:?}", mode, outcome);
            outcome
        }
    }

    fn send(&mut self, payload: &[u8]) -> impl Future<Output = TxOutcome> + Send {
        async move {
            self.log.push(StackCall::Send(payload.to_vec()));
            self.log.enter();
            if !self.send_latency.is_zero() {
                tokio::time::sleep(self.send_latency).await;
            }
            let outcome = self.send_script.pop_front().unwrap_or(TxOutcome::Ok);
            self.log.leave();
            info!("Simulated uplink of {} bytes: {:?}", payload.len(), outcome);
            outcome
        }
    }

    fn await_completion(&mut self) -> impl Future<Output = ()> + Send {
        async move {
            self.log.push(StackCall::AwaitCompletion);
            if !self.completion_latency.is_zero() {
                tokio::time::sleep(self.completion_latency).await;
            }
        }
    }
}
