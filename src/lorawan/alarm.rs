//! Wake-up alarms and the tick channel feeding the uplink scheduler.
//!
//! # Bridge Pattern
//!
//! An [`AlarmSource`] fires its callback from its own execution context
//! (a timer task here, an RTC interrupt on bare metal). The callback only
//! performs a non-blocking `try_send` of a [`Tick`] into a capacity-1
//! channel; the scheduler awaits the receiving end. A tick arriving while
//! the slot is occupied is coalesced with the queued one.
//!
//! ```ignore
//! let (ticks, mut rx) = tick_channel();
//! let mut alarm = TokioAlarm::new();
//! let token = alarm.schedule_once(alarm.now() + period, ticks.alarm_callback())?;
//! let tick = rx.recv().await;
//! ```

use log::{debug, trace};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Identifier of one armed alarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AlarmId(pub u64);

/// Callback run once when an alarm fires. Receives the alarm's id.
pub type AlarmCallback = Box<dyn FnOnce(AlarmId) + Send + 'static>;

/// Handle on the single outstanding alarm.
///
/// Not `Clone`; giving it back through [`AlarmSource::disarm`] is the only
/// way to release the alarm slot before it fires.
#[derive(Debug, PartialEq, Eq)]
pub struct AlarmToken {
    id: AlarmId,
    deadline: Instant,
}

impl AlarmToken {
    pub fn new(id: AlarmId, deadline: Instant) -> Self {
        Self { id, deadline }
    }

    pub fn id(&self) -> AlarmId {
        self.id
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }
}

/// Errors raised by an alarm source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlarmError {
    /// An alarm is already armed and has not fired.
    AlreadyArmed { outstanding: AlarmId },
}

impl fmt::Display for AlarmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyArmed { outstanding } => {
                write!(f, "alarm {} is still outstanding", outstanding.0)
            }
        }
    }
}

impl std::error::Error for AlarmError {}

/// Real-time clock with a one-shot alarm.
pub trait AlarmSource: Send + 'static {
    /// Current time of the clock the alarms are scheduled against.
    fn now(&self) -> Instant;

    /// Arm a one-shot alarm at the absolute instant `at`.
    ///
    /// The callback runs exactly once, from the source's own context.
    /// Fails with [`AlarmError::AlreadyArmed`] while a previous alarm is
    /// armed and has not fired yet.
    fn schedule_once(&mut self, at: Instant, callback: AlarmCallback)
        -> Result<AlarmToken, AlarmError>;

    /// Release an alarm. If it has not fired yet its callback never runs.
    fn disarm(&mut self, token: AlarmToken);
}

struct Armed {
    id: AlarmId,
    fired: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

/// Alarm source backed by the tokio timer.
///
/// Every alarm is a spawned task sleeping until its deadline, so it must be
/// used from within a tokio runtime.
#[derive(Default)]
pub struct TokioAlarm {
    next_id: u64,
    armed: Option<Armed>,
}

impl TokioAlarm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an alarm is armed and has not fired.
    pub fn is_armed(&self) -> bool {
        self.armed
            .as_ref()
            .map(|a| !a.fired.load(Ordering::Acquire) && !a.task.is_finished())
            .unwrap_or(false)
    }
}

impl AlarmSource for TokioAlarm {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn schedule_once(
        &mut self,
        at: Instant,
        callback: AlarmCallback,
    ) -> Result<AlarmToken, AlarmError> {
        if let Some(armed) = &self.armed {
            if self.is_armed() {
                return Err(AlarmError::AlreadyArmed {
                    outstanding: armed.id,
                });
            }
        }

        self.next_id += 1;
        let id = AlarmId(self.next_id);
        let fired = Arc::new(AtomicBool::new(false));
        let fired_flag = fired.clone();

        let task = tokio::spawn(async move {
            tokio::time::sleep_until(at).await;
            fired_flag.store(true, Ordering::Release);
            trace!("Alarm {} fired", id.0);
            callback(id);
        });

        self.armed = Some(Armed { id, fired, task });
        Ok(AlarmToken::new(id, at))
    }

    fn disarm(&mut self, token: AlarmToken) {
        if let Some(armed) = self.armed.take() {
            if armed.id == token.id {
                if !armed.fired.load(Ordering::Acquire) {
                    debug!("Alarm {} cancelled", armed.id.0);
                }
                armed.task.abort();
            } else {
                self.armed = Some(armed);
            }
        }
    }
}

/// Where a tick came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickSource {
    /// The alarm with this id fired.
    Alarm(AlarmId),
    /// Someone asked for an uplink now.
    External,
}

/// Signal that the next transmission window has arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub source: TickSource,
}

impl Tick {
    pub fn alarm(id: AlarmId) -> Self {
        Self {
            source: TickSource::Alarm(id),
        }
    }

    pub fn external() -> Self {
        Self {
            source: TickSource::External,
        }
    }
}

/// Producer side of the tick channel. Cheap to clone, never blocks.
#[derive(Debug, Clone)]
pub struct TickSender {
    tx: mpsc::Sender<Tick>,
}

impl TickSender {
    /// Enqueue a tick without blocking.
    ///
    /// Returns `false` if the tick was dropped because one is already
    /// queued (or the scheduler is gone).
    pub fn fire(&self, tick: Tick) -> bool {
        match self.tx.try_send(tick) {
            Ok(()) => true,
            Err(TrySendError::Full(dropped)) => {
                debug!("Tick {:?} coalesced with queued tick", dropped.source);
                false
            }
            Err(TrySendError::Closed(_)) => {
                trace!("Tick dropped, scheduler stopped");
                false
            }
        }
    }

    /// Request an uplink outside the alarm cadence.
    pub fn trigger(&self) -> bool {
        self.fire(Tick::external())
    }

    /// Callback to hand to [`AlarmSource::schedule_once`].
    pub fn alarm_callback(&self) -> AlarmCallback {
        let sender = self.clone();
        Box::new(move |id| {
            sender.fire(Tick::alarm(id));
        })
    }
}

/// Consumer side of the tick channel.
#[derive(Debug)]
pub struct TickReceiver {
    rx: mpsc::Receiver<Tick>,
}

impl TickReceiver {
    /// Wait for the next tick. `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<Tick> {
        self.rx.recv().await
    }
}

/// Create the single-slot tick channel.
pub fn tick_channel() -> (TickSender, TickReceiver) {
    let (tx, rx) = mpsc::channel(1);
    (TickSender { tx }, TickReceiver { rx })
}
