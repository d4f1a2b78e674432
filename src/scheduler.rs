//! Cancellable one-shot timers.
//!
//! Components never sleep or spawn on their own. They ask a [`Scheduler`] for
//! a timer, keep the returned [`TimerHandle`], and receive a [`Fired`] value
//! back through the workspace event loop when it expires. Each owner keeps at
//! most one live handle and compares incoming handles against it, so a timer
//! that fires after being superseded is simply ignored.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::AbortHandle;

/// Opaque identifier of a scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

impl fmt::Display for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer-{}", self.0)
    }
}

/// What a timer is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Simulated assistant typing delay.
    AssistantReply,
    /// Embedded preview did not signal in time.
    PreviewTimeout,
}

/// A timer that reached its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fired {
    /// Handle returned by [`Scheduler::schedule`].
    pub handle: TimerHandle,
    /// Kind passed to [`Scheduler::schedule`].
    pub kind: TimerKind,
}

/// Source of one-shot timers.
pub trait Scheduler: Send + Sync + fmt::Debug {
    /// Arrange for `kind` to fire once after `delay`.
    fn schedule(&self, delay: Duration, kind: TimerKind) -> TimerHandle;

    /// Cancel a pending timer. Unknown or already-fired handles are ignored.
    fn cancel(&self, handle: TimerHandle);
}

// ─────────────────────────────────────────────────────────────────────────────
// Tokio
// ─────────────────────────────────────────────────────────────────────────────

/// Scheduler backed by `tokio::time::sleep` tasks.
///
/// Expirations are delivered on the channel returned by [`TokioScheduler::new`].
#[derive(Clone)]
pub struct TokioScheduler {
    inner: Arc<TokioInner>,
}

struct TokioInner {
    next_id: AtomicU64,
    tasks: Mutex<HashMap<TimerHandle, AbortHandle>>,
    tx: mpsc::UnboundedSender<Fired>,
}

impl fmt::Debug for TokioScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pending = self
            .inner
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        f.debug_struct("TokioScheduler")
            .field("pending", &pending)
            .finish()
    }
}

impl TokioScheduler {
    /// Create a scheduler and the receiver its expirations arrive on.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Fired>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let scheduler = Self {
            inner: Arc::new(TokioInner {
                next_id: AtomicU64::new(1),
                tasks: Mutex::new(HashMap::new()),
                tx,
            }),
        };
        (scheduler, rx)
    }

    /// Number of timers that have neither fired nor been cancelled.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.inner
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, kind: TimerKind) -> TimerHandle {
        let handle = TimerHandle(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let inner = Arc::clone(&self.inner);

        // Hold the map lock across spawn so the task cannot remove its entry
        // before it has been inserted.
        let mut tasks = self.inner.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            inner
                .tasks
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&handle);
            let _ = inner.tx.send(Fired { handle, kind });
        });
        tasks.insert(handle, task.abort_handle());
        drop(tasks);

        tracing::trace!(%handle, ?kind, delay_ms = delay.as_millis(), "Timer scheduled");
        handle
    }

    fn cancel(&self, handle: TimerHandle) {
        let removed = self
            .inner
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&handle);
        if let Some(task) = removed {
            task.abort();
            tracing::trace!(%handle, "Timer cancelled");
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Manual
// ─────────────────────────────────────────────────────────────────────────────

/// Virtual-clock scheduler. Time only moves when [`ManualScheduler::advance`]
/// is called, which makes timer-driven behaviour deterministic in tests.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    inner: Mutex<ManualInner>,
}

#[derive(Debug, Default)]
struct ManualInner {
    now: Duration,
    next_id: u64,
    pending: Vec<ManualTimer>,
}

#[derive(Debug, Clone, Copy)]
struct ManualTimer {
    due: Duration,
    handle: TimerHandle,
    kind: TimerKind,
}

impl ManualScheduler {
    /// Create a scheduler at virtual time zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward and return every timer that came due, in
    /// deadline order.
    pub fn advance(&self, by: Duration) -> Vec<Fired> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.now += by;
        let now = inner.now;

        let (mut due, waiting): (Vec<_>, Vec<_>) =
            inner.pending.drain(..).partition(|t| t.due <= now);
        inner.pending = waiting;
        due.sort_by_key(|t| (t.due, t.handle));

        due.into_iter()
            .map(|t| Fired {
                handle: t.handle,
                kind: t.kind,
            })
            .collect()
    }

    /// Number of timers still waiting.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pending
            .len()
    }

    /// Remaining delays of the waiting timers of `kind`.
    #[must_use]
    pub fn remaining(&self, kind: TimerKind) -> Vec<Duration> {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner
            .pending
            .iter()
            .filter(|t| t.kind == kind)
            .map(|t| t.due.saturating_sub(inner.now))
            .collect()
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, kind: TimerKind) -> TimerHandle {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.next_id += 1;
        let handle = TimerHandle(inner.next_id);
        let due = inner.now + delay;
        inner.pending.push(ManualTimer { due, handle, kind });
        handle
    }

    fn cancel(&self, handle: TimerHandle) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.pending.retain(|t| t.handle != handle);
    }
}
