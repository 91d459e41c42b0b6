//! Periodic uplinks once the node has joined.
//!
//! # Cycle
//!
//! 1. Wait for a tick (alarm or external trigger)
//! 2. Hold back if the previous uplink started less than one period ago
//! 3. Check the regional airtime budget, skip the cycle if exhausted
//! 4. `send`, then `await_completion` (bounded by a timeout)
//! 5. Arm the next alarm at *now + period*
//!
//! The next deadline is computed from the time the cycle ends, not from the
//! previous deadline. A slow send therefore pushes later uplinks back
//! instead of letting them bunch up, at the cost of the cadence drifting by
//! the duration of each cycle.
//!
//! Everything runs in one task, so a tick that arrives during a send simply
//! waits in the channel: there is never more than one uplink in flight.

use super::activation::Joined;
use super::alarm::{
    tick_channel, AlarmError, AlarmSource, AlarmToken, Tick, TickReceiver, TickSender, TickSource,
};
use super::session::RadioSession;
use super::stack::{RadioStack, TxOutcome};
use crate::lora::{calculate_airtime_us, lorawan_frame_len, DataRate, DutyCycleLimiter, Region};
use log::{debug, error, info, warn};
use std::fmt;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Upper bound on `await_completion`. Two RX windows plus a join-accept
/// sized delay fit comfortably.
pub const DEFAULT_COMPLETION_TIMEOUT: Duration = Duration::from_secs(30);

/// Message sent when no other payload source is configured.
pub const DEFAULT_MESSAGE: &[u8] = b"This is RIOT!";

/// What the scheduler is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Not started.
    Idle,
    /// Uplink (and its RX windows) in progress.
    Sending,
    /// Waiting for the next tick.
    AwaitingTick,
}

/// Produces the bytes of each uplink.
pub trait PayloadSource: Send + 'static {
    fn next_payload(&mut self) -> Vec<u8>;
}

impl<P: PayloadSource + ?Sized> PayloadSource for Box<P> {
    fn next_payload(&mut self) -> Vec<u8> {
        (**self).next_payload()
    }
}

/// Same message every time.
#[derive(Debug, Clone)]
pub struct FixedPayload(pub Vec<u8>);

impl Default for FixedPayload {
    fn default() -> Self {
        Self(DEFAULT_MESSAGE.to_vec())
    }
}

impl PayloadSource for FixedPayload {
    fn next_payload(&mut self) -> Vec<u8> {
        self.0.clone()
    }
}

/// `ping:<n>` with an increasing counter.
#[derive(Debug, Clone, Default)]
pub struct CounterPayload {
    counter: u32,
}

impl PayloadSource for CounterPayload {
    fn next_payload(&mut self) -> Vec<u8> {
        self.counter = self.counter.wrapping_add(1);
        format!("ping:{}", self.counter).into_bytes()
    }
}

/// Scheduler settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub region: Region,
    pub data_rate: DataRate,
    /// `None` waits for the stack indefinitely.
    pub completion_timeout: Option<Duration>,
    /// Skip uplinks that would exceed the regional duty cycle budget.
    pub airtime_budget: bool,
    /// Stop after this many cycles. `None` runs until cancelled.
    pub max_uplinks: Option<u32>,
}

impl SchedulerConfig {
    pub fn new(region: Region, data_rate: DataRate) -> Self {
        Self {
            region,
            data_rate,
            completion_timeout: Some(DEFAULT_COMPLETION_TIMEOUT),
            airtime_budget: true,
            max_uplinks: None,
        }
    }

    pub fn with_max_uplinks(mut self, uplinks: u32) -> Self {
        self.max_uplinks = Some(uplinks);
        self
    }
}

/// Counters kept by the scheduler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UplinkStats {
    /// Ticks that started a cycle.
    pub cycles: u32,
    pub tx_ok: u32,
    pub tx_error: u32,
    pub tx_busy: u32,
    pub tx_not_joined: u32,
    pub tx_scheduled: u32,
    pub completion_timeouts: u32,
    /// Cycles skipped because the airtime budget was spent.
    pub budget_skips: u32,
    /// Alarm ticks discarded because their alarm was no longer armed.
    pub stale_ticks: u32,
    pub alarms_armed: u32,
}

impl UplinkStats {
    /// Number of `send` calls made.
    pub fn sends(&self) -> u32 {
        self.tx_ok + self.tx_error + self.tx_busy + self.tx_not_joined + self.tx_scheduled
    }
}

/// Why the scheduler loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Cancelled,
    UplinkLimit,
}

/// Returned when the scheduler stops.
pub struct SchedulerReport<S: RadioStack> {
    pub session: RadioSession<S>,
    pub stats: UplinkStats,
    pub reason: StopReason,
}

/// Errors that stop the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    /// The alarm source refused to arm.
    Alarm(AlarmError),
    /// A deadline one period ahead is not representable by the clock.
    PeriodOverflow { period: Duration },
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Alarm(e) => write!(f, "alarm error: {}", e),
            Self::PeriodOverflow { period } => {
                write!(f, "uplink period of {}s overflows the clock", period.as_secs())
            }
        }
    }
}

impl std::error::Error for SchedulerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Alarm(e) => Some(e),
            Self::PeriodOverflow { .. } => None,
        }
    }
}

impl From<AlarmError> for SchedulerError {
    fn from(e: AlarmError) -> Self {
        Self::Alarm(e)
    }
}

/// Sends an uplink every period over a joined session.
pub struct UplinkScheduler<S: RadioStack, A: AlarmSource, P: PayloadSource> {
    session: RadioSession<S>,
    alarm: A,
    payload: P,
    config: SchedulerConfig,
    ticks: TickReceiver,
    ticker: TickSender,
    pending: Option<AlarmToken>,
    last_send_start: Option<Instant>,
    limiter: DutyCycleLimiter,
    state: watch::Sender<SchedulerState>,
    stats: UplinkStats,
}

impl<S: RadioStack, A: AlarmSource, P: PayloadSource> UplinkScheduler<S, A, P> {
    pub fn new(joined: Joined<S>, alarm: A, payload: P, config: SchedulerConfig) -> Self {
        let (ticker, ticks) = tick_channel();
        let limiter = config.region.duty_cycle_limiter();
        let (state, _) = watch::channel(SchedulerState::Idle);
        Self {
            session: joined.session,
            alarm,
            payload,
            config,
            ticks,
            ticker,
            pending: None,
            last_send_start: None,
            limiter,
            state,
            stats: UplinkStats::default(),
        }
    }

    /// Handle for external triggers, usable from any task.
    pub fn tick_sender(&self) -> TickSender {
        self.ticker.clone()
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    /// Follow state changes after `start` has taken the scheduler.
    pub fn state_watch(&self) -> watch::Receiver<SchedulerState> {
        self.state.subscribe()
    }

    fn set_state(&self, state: SchedulerState) {
        self.state.send_replace(state);
    }

    pub fn stats(&self) -> &UplinkStats {
        &self.stats
    }

    /// Arm the first alarm one period from now and run the uplink loop.
    ///
    /// Runs until `cancel` fires or `max_uplinks` cycles have completed.
    pub async fn start(
        mut self,
        period: Duration,
        cancel: CancellationToken,
    ) -> Result<SchedulerReport<S>, SchedulerError> {
        info!("Uplink scheduler started, period {}s", period.as_secs());
        self.arm_next(period)?;

        let reason = loop {
            self.set_state(SchedulerState::AwaitingTick);
            debug!("Waiting for trigger");

            let tick = tokio::select! {
                _ = cancel.cancelled() => break StopReason::Cancelled,
                tick = self.ticks.recv() => tick,
            };
            // We hold a sender ourselves, so the channel never closes
            let Some(tick) = tick else {
                break StopReason::Cancelled;
            };

            if !self.accept(tick) {
                continue;
            }

            if !self.hold_back(period, &cancel).await? {
                break StopReason::Cancelled;
            }
            self.cycle().await;
            self.stats.cycles += 1;

            if let Some(max) = self.config.max_uplinks {
                if self.stats.cycles >= max {
                    break StopReason::UplinkLimit;
                }
            }

            self.arm_next(period)?;
        };

        if let Some(token) = self.pending.take() {
            self.alarm.disarm(token);
        }
        self.set_state(SchedulerState::Idle);
        info!("Uplink scheduler stopped: {:?}", reason);

        Ok(SchedulerReport {
            session: self.session,
            stats: self.stats,
            reason,
        })
    }

    /// Decide whether a tick starts a cycle.
    fn accept(&mut self, tick: Tick) -> bool {
        match tick.source {
            TickSource::Alarm(id) => match self.pending.take() {
                Some(token) if token.id() == id => {
                    self.alarm.disarm(token);
                    true
                }
                other => {
                    self.pending = other;
                    debug!("Discarding stale tick from alarm {}", id.0);
                    self.stats.stale_ticks += 1;
                    false
                }
            },
            TickSource::External => {
                debug!("External trigger received");
                if let Some(token) = self.pending.take() {
                    self.alarm.disarm(token);
                }
                true
            }
        }
    }

    /// Keep consecutive uplinks at least one period apart.
    ///
    /// Returns `false` if cancelled while waiting.
    async fn hold_back(
        &mut self,
        period: Duration,
        cancel: &CancellationToken,
    ) -> Result<bool, SchedulerError> {
        let Some(last) = self.last_send_start else {
            return Ok(true);
        };
        let earliest = last
            .checked_add(period)
            .ok_or(SchedulerError::PeriodOverflow { period })?;
        let now = self.alarm.now();
        if now >= earliest {
            return Ok(true);
        }

        debug!("Deferring uplink by {}ms", (earliest - now).as_millis());
        tokio::select! {
            _ = cancel.cancelled() => Ok(false),
            _ = tokio::time::sleep_until(earliest) => Ok(true),
        }
    }

    async fn cycle(&mut self) {
        let payload = self.payload.next_payload();

        if self.config.airtime_budget && !self.consume_airtime(payload.len()) {
            return;
        }

        self.set_state(SchedulerState::Sending);
        self.last_send_start = Some(self.alarm.now());

        info!("Sending {} bytes", payload.len());
        let outcome = self.session.stack_mut().send(&payload).await;
        self.record(outcome);

        debug!("Waiting for LoRaWAN stack completion");
        let completion = self.session.stack_mut().await_completion();
        match self.config.completion_timeout {
            Some(limit) => {
                if tokio::time::timeout(limit, completion).await.is_err() {
                    error!(
                        "LoRaWAN stack did not complete within {}s, re-arming",
                        limit.as_secs()
                    );
                    self.stats.completion_timeouts += 1;
                    return;
                }
            }
            None => completion.await,
        }
        debug!("Sending done");
    }

    /// Log and count the outcome of one send. None of them is fatal: the
    /// next period tries again.
    fn record(&mut self, outcome: TxOutcome) {
        match outcome {
            TxOutcome::Ok => {
                info!("{}", outcome);
                self.stats.tx_ok += 1;
            }
            TxOutcome::Error => {
                warn!("{}", outcome);
                self.stats.tx_error += 1;
            }
            TxOutcome::Busy => {
                warn!("{}, retrying next period", outcome);
                self.stats.tx_busy += 1;
            }
            TxOutcome::NotJoined => {
                error!("{}, session lost?", outcome);
                self.stats.tx_not_joined += 1;
            }
            TxOutcome::Scheduled => {
                info!("{}", outcome);
                self.stats.tx_scheduled += 1;
            }
        }
    }

    /// Charge the uplink against the airtime budget.
    fn consume_airtime(&mut self, payload_len: usize) -> bool {
        let Some(params) = self.config.region.uplink_params(self.config.data_rate) else {
            return true;
        };
        let airtime = calculate_airtime_us(lorawan_frame_len(payload_len), &params);
        if self.limiter.try_consume(airtime) {
            debug!(
                "Uplink airtime {}us, {:.0}% of duty cycle budget left",
                airtime,
                self.limiter.remaining_percent()
            );
            return true;
        }

        match self.limiter.time_until_available(airtime) {
            Some(wait) => warn!(
                "Duty cycle budget exhausted, skipping uplink ({}s until {}us available)",
                wait.as_secs(),
                airtime
            ),
            None => warn!(
                "Uplink of {}us exceeds the whole {} duty cycle budget",
                airtime, self.config.region
            ),
        }
        self.stats.budget_skips += 1;
        false
    }

    fn arm_next(&mut self, period: Duration) -> Result<(), SchedulerError> {
        if let Some(token) = self.pending.take() {
            self.alarm.disarm(token);
        }
        let deadline = self
            .alarm
            .now()
            .checked_add(period)
            .ok_or(SchedulerError::PeriodOverflow { period })?;
        let token = self
            .alarm
            .schedule_once(deadline, self.ticker.alarm_callback())?;
        debug!("Next uplink in {}s (alarm {})", period.as_secs(), token.id().0);
        self.pending = Some(token);
        self.stats.alarms_armed += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ActivationMode;
    use crate::lorawan::alarm::{AlarmCallback, TokioAlarm};
    use crate::lorawan::sim::SimulatedStack;
    use std::sync::{Arc, Mutex};

    const PERIOD: Duration = Duration::from_secs(20);

    /// Records every deadline it is asked to arm.
    #[derive(Clone, Default)]
    struct RecordingAlarm {
        inner: Arc<Mutex<TokioAlarm>>,
        deadlines: Arc<Mutex<Vec<Instant>>>,
    }

    impl RecordingAlarm {
        fn deadlines(&self) -> Vec<Instant> {
            self.deadlines.lock().unwrap().clone()
        }
    }

    impl AlarmSource for RecordingAlarm {
        fn now(&self) -> Instant {
            Instant::now()
        }

        fn schedule_once(
            &mut self,
            at: Instant,
            callback: AlarmCallback,
        ) -> Result<AlarmToken, AlarmError> {
            let token = self.inner.lock().unwrap().schedule_once(at, callback)?;
            self.deadlines.lock().unwrap().push(at);
            Ok(token)
        }

        fn disarm(&mut self, token: AlarmToken) {
            self.inner.lock().unwrap().disarm(token);
        }
    }

    fn joined(stack: SimulatedStack) -> Joined<SimulatedStack> {
        Joined {
            session: RadioSession::new(stack),
            mode: ActivationMode::Abp,
            attempts: 1,
        }
    }

    fn config() -> SchedulerConfig {
        SchedulerConfig::new(Region::Eu868, DataRate::DR3)
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_uplink_one_period_after_start() {
        let stack = SimulatedStack::new();
        let log = stack.log();
        let start = Instant::now();

        let report = UplinkScheduler::new(
            joined(stack),
            TokioAlarm::new(),
            FixedPayload::default(),
            config().with_max_uplinks(1),
        )
        .start(PERIOD, CancellationToken::new())
        .await
        .unwrap();

        assert_eq!(report.reason, StopReason::UplinkLimit);
        assert_eq!(log.send_times()[0] - start, PERIOD);
        assert_eq!(report.stats.tx_ok, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_outcome_is_handled_and_loop_continues() {
        let stack = SimulatedStack::new().with_send_outcomes([
            TxOutcome::Error,
            TxOutcome::Busy,
            TxOutcome::NotJoined,
            TxOutcome::Scheduled,
            TxOutcome::Ok,
        ]);
        let log = stack.log();

        let report = UplinkScheduler::new(
            joined(stack),
            TokioAlarm::new(),
            FixedPayload::default(),
            config().with_max_uplinks(5),
        )
        .start(PERIOD, CancellationToken::new())
        .await
        .unwrap();

        let stats = report.stats;
        assert_eq!(
            (
                stats.tx_error,
                stats.tx_busy,
                stats.tx_not_joined,
                stats.tx_scheduled,
                stats.tx_ok
            ),
            (1, 1, 1, 1, 1)
        );
        assert_eq!(stats.sends(), 5);
        // Completion is awaited after failures too
        assert_eq!(log.completion_count(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_next_deadline_is_now_plus_period() {
        let send = Duration::from_secs(3);
        let rx_windows = Duration::from_secs(2);
        let stack = SimulatedStack::new()
            .with_send_latency(send)
            .with_completion_latency(rx_windows);
        let log = stack.log();
        let alarm = RecordingAlarm::default();
        let start = Instant::now();

        UplinkScheduler::new(
            joined(stack),
            alarm.clone(),
            FixedPayload::default(),
            config().with_max_uplinks(3),
        )
        .start(PERIOD, CancellationToken::new())
        .await
        .unwrap();

        let cycle = PERIOD + send + rx_windows;
        let deadlines: Vec<_> = alarm.deadlines().iter().map(|d| *d - start).collect();
        assert_eq!(deadlines, vec![PERIOD, cycle + PERIOD, cycle * 2 + PERIOD]);

        let sends: Vec<_> = log.send_times().iter().map(|t| *t - start).collect();
        assert_eq!(sends, vec![PERIOD, cycle + PERIOD, cycle * 2 + PERIOD]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_completion_timeout_rearms() {
        let stack = SimulatedStack::new().with_completion_latency(Duration::from_secs(3600));
        let log = stack.log();
        let mut cfg = config().with_max_uplinks(2);
        cfg.completion_timeout = Some(Duration::from_secs(5));
        let start = Instant::now();

        let report = UplinkScheduler::new(
            joined(stack),
            TokioAlarm::new(),
            FixedPayload::default(),
            cfg,
        )
        .start(PERIOD, CancellationToken::new())
        .await
        .unwrap();

        assert_eq!(report.stats.completion_timeouts, 2);
        let sends: Vec<_> = log.send_times().iter().map(|t| *t - start).collect();
        assert_eq!(
            sends,
            vec![PERIOD, PERIOD + Duration::from_secs(5) + PERIOD]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_external_trigger_sends_immediately_once() {
        let stack = SimulatedStack::new();
        let log = stack.log();
        let alarm = RecordingAlarm::default();
        let start = Instant::now();

        let scheduler = UplinkScheduler::new(
            joined(stack),
            alarm.clone(),
            FixedPayload::default(),
            config().with_max_uplinks(2),
        );
        let ticks = scheduler.tick_sender();
        let task = tokio::spawn(scheduler.start(PERIOD, CancellationToken::new()));

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(ticks.trigger());

        let report = task.await.unwrap().unwrap();
        let sends: Vec<_> = log.send_times().iter().map(|t| *t - start).collect();
        // The trigger replaces the first alarm, the next one follows a period later
        assert_eq!(
            sends,
            vec![Duration::from_secs(2), Duration::from_secs(2) + PERIOD]
        );
        assert_eq!(report.stats.stale_ticks, 0);
        assert_eq!(alarm.deadlines().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_alarm_tick_is_discarded() {
        let stack = SimulatedStack::new();
        let log = stack.log();

        let scheduler = UplinkScheduler::new(
            joined(stack),
            TokioAlarm::new(),
            FixedPayload::default(),
            config().with_max_uplinks(1),
        );
        let ticks = scheduler.tick_sender();
        // An alarm id the scheduler never armed
        assert!(ticks.fire(Tick::alarm(crate::lorawan::alarm::AlarmId(999))));

        let report = scheduler
            .start(PERIOD, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(report.stats.stale_ticks, 1);
        assert_eq!(log.send_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_between_cycles() {
        let stack = SimulatedStack::new();
        let log = stack.log();
        let cancel = CancellationToken::new();

        let scheduler = UplinkScheduler::new(
            joined(stack),
            TokioAlarm::new(),
            FixedPayload::default(),
            config(),
        );
        let task = tokio::spawn(scheduler.start(PERIOD, cancel.clone()));

        tokio::time::sleep(PERIOD * 2 + Duration::from_secs(1)).await;
        cancel.cancel();

        let report = task.await.unwrap().unwrap();
        assert_eq!(report.reason, StopReason::Cancelled);
        assert_eq!(log.send_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_deferred_uplink() {
        let stack = SimulatedStack::new().with_send_latency(Duration::from_secs(5));
        let log = stack.log();
        let cancel = CancellationToken::new();
        let start = Instant::now();

        let scheduler = UplinkScheduler::new(
            joined(stack),
            TokioAlarm::new(),
            FixedPayload::default(),
            config(),
        );
        let ticks = scheduler.tick_sender();
        let task = tokio::spawn(scheduler.start(PERIOD, cancel.clone()));

        // Trigger during the first send; it is held back until t=40
        tokio::time::sleep_until(start + Duration::from_secs(22)).await;
        assert!(ticks.trigger());
        tokio::time::sleep_until(start + Duration::from_secs(30)).await;
        cancel.cancel();

        let report = task.await.unwrap().unwrap();
        assert_eq!(report.reason, StopReason::Cancelled);
        assert_eq!(Instant::now() - start, Duration::from_secs(30));
        assert_eq!(log.send_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_period_overflow_is_an_error() {
        let stack = SimulatedStack::new();
        let log = stack.log();
        let period = Duration::from_secs(u64::MAX);

        let result = UplinkScheduler::new(
            joined(stack),
            TokioAlarm::new(),
            FixedPayload::default(),
            config(),
        )
        .start(period, CancellationToken::new())
        .await;

        assert_eq!(result.err(), Some(SchedulerError::PeriodOverflow { period }));
        assert_eq!(log.send_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_state_follows_cycle() {
        let stack = SimulatedStack::new().with_send_latency(Duration::from_secs(5));
        let cancel = CancellationToken::new();
        let start = Instant::now();

        let scheduler = UplinkScheduler::new(
            joined(stack),
            TokioAlarm::new(),
            FixedPayload::default(),
            config(),
        );
        let state = scheduler.state_watch();
        assert_eq!(*state.borrow(), SchedulerState::Idle);
        let task = tokio::spawn(scheduler.start(PERIOD, cancel.clone()));

        tokio::time::sleep_until(start + Duration::from_secs(1)).await;
        assert_eq!(*state.borrow(), SchedulerState::AwaitingTick);

        // First send runs from t=20 to t=25
        tokio::time::sleep_until(start + Duration::from_secs(22)).await;
        assert_eq!(*state.borrow(), SchedulerState::Sending);

        tokio::time::sleep_until(start + Duration::from_secs(26)).await;
        assert_eq!(*state.borrow(), SchedulerState::AwaitingTick);

        cancel.cancel();
        task.await.unwrap().unwrap();
        assert_eq!(*state.borrow(), SchedulerState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_airtime_budget_skips_uplinks() {
        // A 200-byte payload at DR0 in EU868 is several seconds of airtime;
        // the 36s hourly budget runs out after a handful of uplinks.
        let stack = SimulatedStack::new();
        let log = stack.log();
        let cfg = SchedulerConfig::new(Region::Eu868, DataRate::DR0).with_max_uplinks(10);

        let report = UplinkScheduler::new(
            joined(stack),
            TokioAlarm::new(),
            FixedPayload(vec![0u8; 200]),
            cfg,
        )
        .start(PERIOD, CancellationToken::new())
        .await
        .unwrap();

        assert_eq!(report.stats.cycles, 10);
        assert!(report.stats.budget_skips > 0);
        assert_eq!(
            log.send_count() as u32 + report.stats.budget_skips,
            report.stats.cycles
        );
    }

    #[test]
    fn test_counter_payload() {
        let mut payload = CounterPayload::default();
        assert_eq!(payload.next_payload(), b"ping:1".to_vec());
        assert_eq!(payload.next_payload(), b"ping:2".to_vec());
    }

    #[tokio::test]
    async fn test_state_starts_idle() {
        let scheduler = UplinkScheduler::new(
            joined(SimulatedStack::new()),
            TokioAlarm::new(),
            FixedPayload::default(),
            config(),
        );
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        assert_eq!(scheduler.stats(), &UplinkStats::default());
    }
}
