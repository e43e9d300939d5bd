use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;
use tracing::debug;

use crate::errors::RefreshFailure;
use crate::telemetry::refresh::RefreshTelemetry;

/// What a settled refresh cycle hands to each waiter: the new token or the failure.
pub type CycleResult = Result<String, RefreshFailure>;

#[derive(Default)]
struct RefreshState {
    refreshing: bool,
    /// Telemetry of the in-flight cycle, so followers log under its attempt id.
    telemetry: Option<RefreshTelemetry>,
    waiters: Vec<oneshot::Sender<CycleResult>>,
}

/// Single-flight coordination for refresh cycles.
///
/// Admission (check the flag, then set it or enqueue) happens inside one
/// critical section, so two near-simultaneous 401s can never both become
/// initiators. The lock is never held across an `.await`.
#[derive(Default)]
pub struct RefreshGate {
    state: Mutex<RefreshState>,
}

/// Result of [`RefreshGate::enter`].
pub enum Admission {
    /// No cycle was in flight; the caller now owns one and must settle it.
    Initiator(RefreshCycle),
    /// A cycle is in flight; `receiver` resolves when it settles.
    Follower {
        telemetry: RefreshTelemetry,
        /// 1-based place in the queue.
        position: usize,
        receiver: oneshot::Receiver<CycleResult>,
    },
}

impl RefreshGate {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RefreshState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Joins the in-flight cycle, or starts one tagged `context` when none is running.
    pub fn enter(self: &Arc<Self>, context: &str) -> Admission {
        let mut state = self.lock();
        if state.refreshing {
            let (tx, rx) = oneshot::channel();
            state.waiters.push(tx);
            let telemetry = state
                .telemetry
                .clone()
                .unwrap_or_else(|| RefreshTelemetry::new(context));
            Admission::Follower {
                telemetry,
                position: state.waiters.len(),
                receiver: rx,
            }
        } else {
            Admission::Initiator(self.start(&mut state, context))
        }
    }

    /// Starts a cycle only when none is running. Never enqueues.
    pub fn try_begin(self: &Arc<Self>, context: &str) -> Option<RefreshCycle> {
        let mut state = self.lock();
        if state.refreshing {
            return None;
        }
        Some(self.start(&mut state, context))
    }

    fn start(self: &Arc<Self>, state: &mut RefreshState, context: &str) -> RefreshCycle {
        let telemetry = RefreshTelemetry::new(context);
        state.refreshing = true;
        state.telemetry = Some(telemetry.clone());
        RefreshCycle {
            gate: Arc::clone(self),
            telemetry,
            closed: false,
        }
    }

    pub fn is_refreshing(&self) -> bool {
        self.lock().refreshing
    }

    pub fn waiting(&self) -> usize {
        self.lock().waiters.len()
    }

    /// Clears the flag and takes the queue in one step; later 401s start a new cycle.
    fn close(&self) -> Release {
        let mut state = self.lock();
        state.refreshing = false;
        state.telemetry = None;
        Release {
            waiters: std::mem::take(&mut state.waiters),
        }
    }
}

/// Waiters taken off a closed cycle, still to be told the outcome.
pub struct Release {
    waiters: Vec<oneshot::Sender<CycleResult>>,
}

impl Release {
    pub fn len(&self) -> usize {
        self.waiters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiters.is_empty()
    }

    /// Sends `result` to every waiter and returns how many there were.
    pub fn broadcast(self, result: CycleResult) -> usize {
        let count = self.waiters.len();
        for waiter in self.waiters {
            // A waiter whose request future was dropped simply misses the result.
            let _ = waiter.send(result.clone());
        }
        count
    }
}

/// Ownership of the in-flight cycle. Dropping it unsettled releases every
/// waiter with an "abandoned" failure and clears the refreshing flag.
pub struct RefreshCycle {
    gate: Arc<RefreshGate>,
    telemetry: RefreshTelemetry,
    closed: bool,
}

impl RefreshCycle {
    pub fn telemetry(&self) -> &RefreshTelemetry {
        &self.telemetry
    }

    /// Waiters queued on this cycle so far.
    pub fn waiting(&self) -> usize {
        self.gate.waiting()
    }

    /// Ends the cycle. No waiter can join after this returns; the caller
    /// decides what to do before broadcasting to the ones taken.
    pub fn close(mut self) -> Release {
        self.closed = true;
        self.gate.close()
    }

    /// Closes the cycle and broadcasts `result` to every waiter.
    /// Returns how many waiters were released.
    pub fn settle(self, result: CycleResult) -> usize {
        self.close().broadcast(result)
    }
}

impl Drop for RefreshCycle {
    fn drop(&mut self) {
        if !self.closed {
            let released = self.gate.close().broadcast(Err(RefreshFailure::abandoned()));
            debug!(
                attempt_id = %self.telemetry.attempt_id(),
                "refresh cycle dropped unsettled; released {} waiter(s)", released
            );
        }
    }
}
