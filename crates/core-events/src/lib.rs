//! Progress events and run control for the optimizer.
//!
//! The solver publishes immutable `ProgressEvent` records onto a bounded
//! channel per subscriber; subscribers pull at their own pace. A full
//! subscriber channel drops the event for that subscriber rather than
//! blocking a worker: progress is an observability stream, never a
//! synchronization point. Drops are counted in a process-wide telemetry
//! counter so tests and operators can see lossiness.
//!
//! `CancelToken` is the cooperative cancellation primitive observed at the
//! top of each SA iteration and each GA generation. A wall-clock budget is
//! expressed as a deadline on the same token, so "budget exhausted" and
//! "externally cancelled" share one code path.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use serde::{Deserialize, Serialize};

/// Per-subscriber channel capacity. Sized for a full default run (SA
/// iterations + GA generations) with headroom; a slow subscriber loses
/// oldest-first bursts rather than stalling workers.
pub const PROGRESS_CHANNEL_CAP: usize = 4096;

/// Events successfully handed to at least one subscriber.
pub static EVENTS_PUBLISHED: AtomicU64 = AtomicU64::new(0);
/// Events dropped because a subscriber's channel was full.
pub static EVENTS_DROPPED: AtomicU64 = AtomicU64::new(0);

/// Optimization phase tag carried by every event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Sa,
    Ga,
    Roads,
    Quality,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Sa => write!(f, "SA"),
            Phase::Ga => write!(f, "GA"),
            Phase::Roads => write!(f, "roads"),
            Phase::Quality => write!(f, "quality"),
        }
    }
}

/// A mid-run observation. `iteration` is monotonic within a phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Milliseconds since the run started.
    pub elapsed_ms: u64,
    pub phase: Phase,
    pub iteration: usize,
    pub best_fitness: f64,
    pub population_diversity: f64,
    /// Current operator selection probabilities, name -> weight.
    pub operator_mix: Vec<(String, f64)>,
}

struct BusInner {
    subscribers: Mutex<Vec<Sender<ProgressEvent>>>,
    started: Instant,
}

/// Multi-subscriber publisher. Cloning shares the subscriber list.
#[derive(Clone)]
pub struct ProgressBus {
    inner: Arc<BusInner>,
}

impl Default for ProgressBus {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressBus {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BusInner {
                subscribers: Mutex::new(Vec::new()),
                started: Instant::now(),
            }),
        }
    }

    /// Milliseconds since bus creation; the event timestamp source.
    pub fn elapsed_ms(&self) -> u64 {
        self.inner.started.elapsed().as_millis() as u64
    }

    /// Register a new subscriber and return its receiving end.
    pub fn subscribe(&self) -> Receiver<ProgressEvent> {
        let (tx, rx) = bounded(PROGRESS_CHANNEL_CAP);
        self.inner
            .subscribers
            .lock()
            .expect("progress subscriber list poisoned")
            .push(tx);
        tracing::debug!(target: "events", "progress_subscriber_registered");
        rx
    }

    pub fn has_subscribers(&self) -> bool {
        !self
            .inner
            .subscribers
            .lock()
            .expect("progress subscriber list poisoned")
            .is_empty()
    }

    /// Fan the event out to every live subscriber. Disconnected receivers
    /// are pruned in place; full channels drop the event for that receiver.
    pub fn publish(&self, event: ProgressEvent) {
        let mut subs = self
            .inner
            .subscribers
            .lock()
            .expect("progress subscriber list poisoned");
        if subs.is_empty() {
            return;
        }
        let mut delivered = false;
        subs.retain(|tx| match tx.try_send(event.clone()) {
            Ok(()) => {
                delivered = true;
                true
            }
            Err(TrySendError::Full(_)) => {
                EVENTS_DROPPED.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        });
        if delivered {
            EVENTS_PUBLISHED.fetch_add(1, Ordering::Relaxed);
        }
    }
}

struct CancelInner {
    flag: AtomicBool,
    deadline: Mutex<Option<Instant>>,
}

/// Cooperative cancellation shared between the orchestrator, its workers,
/// and the embedding application. Clones share state.
#[derive(Clone)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(CancelInner {
                flag: AtomicBool::new(false),
                deadline: Mutex::new(None),
            }),
        }
    }

    /// Arm a wall-clock budget measured from now.
    pub fn set_budget(&self, budget: Duration) {
        let mut deadline = self
            .inner
            .deadline
            .lock()
            .expect("cancel deadline poisoned");
        *deadline = Some(Instant::now() + budget);
    }

    pub fn cancel(&self) {
        self.inner.flag.store(true, Ordering::SeqCst);
    }

    /// True once cancelled explicitly or past the armed deadline. Deadline
    /// expiry latches the flag so later checks are cheap and consistent.
    pub fn is_cancelled(&self) -> bool {
        if self.inner.flag.load(Ordering::SeqCst) {
            return true;
        }
        let expired = {
            let deadline = self
                .inner
                .deadline
                .lock()
                .expect("cancel deadline poisoned");
            deadline.map(|d| Instant::now() >= d).unwrap_or(false)
        };
        if expired {
            self.inner.flag.store(true, Ordering::SeqCst);
        }
        expired
    }
}
