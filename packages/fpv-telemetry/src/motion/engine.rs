// Motion engine - recurring tick that animates one instrument
//
// The engine owns a spawned task that interleaves two sources:
// - target updates from a selector's watch channel
// - a fixed-cadence tick that advances the instrument and publishes a frame
// Cancellation is checked before every tick, so nothing runs after `stop`.

use crate::hub::SnapshotHub;
use crate::selector::Selector;
use crate::types::Snapshot;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Nominal display refresh period (~60 Hz)
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(16);

/// Shortest tick period accepted; smaller values are raised to this
pub const MIN_TICK_INTERVAL: Duration = Duration::from_millis(1);

/// An animated instrument: accepts targets, produces a frame per tick
pub trait Instrument: Send + 'static {
    /// Value projected from a snapshot that the instrument chases
    type Target: Clone + Send + Sync + 'static;

    /// Derived screen state handed to presentation
    type Frame: Clone + Send + Sync + 'static;

    /// Short name used in logs
    fn name(&self) -> &'static str;

    fn set_target(&mut self, target: Self::Target);

    /// Advance one tick toward the target
    fn step(&mut self) -> Self::Frame;

    /// Pull this instrument's target out of a snapshot, if present
    fn project(snapshot: &Snapshot) -> Option<Self::Target>;
}

/// Recurring smoothing task bound to one instrument
pub struct MotionEngine<I: Instrument> {
    instrument: Arc<Mutex<I>>,
    frames: watch::Receiver<Option<I::Frame>>,
    ticks: Arc<AtomicU64>,
    cancel_token: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
    selector: Option<Selector<Option<I::Target>>>,
}

impl<I: Instrument> MotionEngine<I> {
    /// Start ticking with targets supplied only through `set_target`
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(instrument: I, tick_interval: Duration) -> Self {
        Self::spawn(instrument, tick_interval, None)
    }

    /// Start ticking and follow the hub through a selector on `I::project`
    ///
    /// Must be called from within a Tokio runtime.
    pub fn follow(hub: &SnapshotHub, instrument: I, tick_interval: Duration) -> Self {
        let selector = Selector::new(hub, I::project);
        Self::spawn(instrument, tick_interval, Some(selector))
    }

    fn spawn(
        instrument: I,
        tick_interval: Duration,
        selector: Option<Selector<Option<I::Target>>>,
    ) -> Self {
        let name = instrument.name();
        let tick_interval = if tick_interval < MIN_TICK_INTERVAL {
            warn!(
                "Tick interval {:?} for {} raised to {:?}",
                tick_interval, name, MIN_TICK_INTERVAL
            );
            MIN_TICK_INTERVAL
        } else {
            tick_interval
        };
        let instrument = Arc::new(Mutex::new(instrument));
        let (frame_tx, frames) = watch::channel(None);
        let ticks = Arc::new(AtomicU64::new(0));
        let cancel_token = CancellationToken::new();
        let targets = selector.as_ref().map(|s| s.watch());

        let task = tokio::spawn(run_ticks(
            name,
            Arc::clone(&instrument),
            targets,
            frame_tx,
            Arc::clone(&ticks),
            cancel_token.clone(),
            tick_interval,
        ));

        debug!("Motion engine started: {} every {:?}", name, tick_interval);

        Self {
            instrument,
            frames,
            ticks,
            cancel_token,
            task: Mutex::new(Some(task)),
            selector,
        }
    }

    /// Replace the target; the next tick starts chasing it
    pub fn set_target(&self, target: I::Target) {
        self.instrument.lock().set_target(target);
    }

    /// Latest frame, `None` before the first tick
    pub fn frame(&self) -> Option<I::Frame> {
        self.frames.borrow().clone()
    }

    /// Receiver that wakes after every tick
    pub fn frames(&self) -> watch::Receiver<Option<I::Frame>> {
        self.frames.clone()
    }

    /// Number of ticks applied so far
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::SeqCst)
    }

    /// Run `f` against the instrument state
    pub fn inspect<R>(&self, f: impl FnOnce(&I) -> R) -> R {
        f(&self.instrument.lock())
    }

    pub fn is_running(&self) -> bool {
        !self.cancel_token.is_cancelled()
    }

    /// Cancel the tick and stop following the hub. Repeated calls are no-ops.
    pub fn stop(&self) {
        if self.cancel_token.is_cancelled() {
            return;
        }

        self.cancel_token.cancel();
        if let Some(selector) = &self.selector {
            selector.detach();
        }
        // Wait out a tick that is mid-step on another worker
        drop(self.instrument.lock());
        debug!("Motion engine stopped");
    }

    /// Stop and wait for the tick task to exit
    pub async fn shutdown(&self) {
        self.stop();
        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!("Motion engine task failed: {}", e);
            }
        }
    }
}

impl<I: Instrument> Drop for MotionEngine<I> {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

async fn run_ticks<I: Instrument>(
    name: &'static str,
    instrument: Arc<Mutex<I>>,
    mut targets: Option<watch::Receiver<Option<Option<I::Target>>>>,
    frame_tx: watch::Sender<Option<I::Frame>>,
    ticks: Arc<AtomicU64>,
    cancel_token: CancellationToken,
    tick_interval: Duration,
) {
    let mut tick = interval(tick_interval);
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;

            _ = cancel_token.cancelled() => {
                break;
            }

            changed = next_target(&mut targets) => {
                match changed {
                    Some(Some(target)) => instrument.lock().set_target(target),
                    // Snapshot without this instrument's sub-record
                    Some(None) => {}
                    // Selector gone; keep ticking on manual targets
                    None => targets = None,
                }
            }

            _ = tick.tick() => {
                if !step_unless_cancelled(&instrument, &frame_tx, &ticks, &cancel_token) {
                    break;
                }
            }
        }
    }

    debug!("Motion engine task for {} exited", name);
}

/// Advance one tick; returns false if the engine was stopped
///
/// Cancellation is checked under the instrument lock, which `stop` also takes,
/// so a tick already enqueued when `stop` was called does nothing.
fn step_unless_cancelled<I: Instrument>(
    instrument: &Mutex<I>,
    frame_tx: &watch::Sender<Option<I::Frame>>,
    ticks: &AtomicU64,
    cancel_token: &CancellationToken,
) -> bool {
    let mut state = instrument.lock();
    if cancel_token.is_cancelled() {
        return false;
    }
    let frame = state.step();
    ticks.fetch_add(1, Ordering::SeqCst);
    frame_tx.send_replace(Some(frame));
    true
}

/// Wait for the next selector notification; pending forever without a selector
async fn next_target<T: Clone>(
    targets: &mut Option<watch::Receiver<Option<Option<T>>>>,
) -> Option<Option<T>> {
    match targets {
        Some(rx) => match rx.changed().await {
            Ok(()) => Some(rx.borrow_and_update().clone().flatten()),
            Err(_) => None,
        },
        None => std::future::pending().await,
    }
}
