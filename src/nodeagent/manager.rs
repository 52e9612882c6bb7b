//! Node Agent Context Manager
//!
//! Rendezvous between the tick scheduler and the node agent loop. The scheduler
//! hands over new contexts with [`NodeAgentContextManager::schedule`], the agent loop
//! blocks in [`NodeAgentContextManager::fetch_next_context`] until a fresh one is due,
//! and a controller can freeze the loop at its idle point with
//! [`NodeAgentContextManager::set_frozen`].
//!
//! All state sits behind one mutex with one condition variable. Waiters compare
//! generation counters against a baseline instead of checking plain flags, so a
//! context or transition that existed before a wait started is never mistaken for
//! one that happened during it.

use crate::clock::{Clock, SystemClock};
use crate::context::NodeAgentContext;
use crate::error::ManagerError;
use crate::nodeagent::slot::{ScheduledEntry, TimeGatedSlot};
use crate::nodeagent::tracker::{Activity, ConvergenceTracker};
use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Requested freeze state and the convergence generation it is measured against.
#[derive(Debug, Clone, Copy)]
struct FreezeRequest {
    frozen: bool,
    baseline: u64,
}

impl FreezeRequest {
    fn new(frozen: bool, tracker: &ConvergenceTracker) -> Self {
        let generation = tracker.generation();
        // Already in the requested state: the transition that got it there counts.
        let baseline = if tracker.activity() == Activity::target(frozen) {
            generation.saturating_sub(1)
        } else {
            generation
        };
        Self { frozen, baseline }
    }
}

struct State<C> {
    current: Arc<C>,
    slot: TimeGatedSlot<C>,
    tracker: ConvergenceTracker,
    freeze: FreezeRequest,
    interrupt_pending: bool,
}

/// Point-in-time view of the manager, for status reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerStatus {
    pub activity: Activity,
    pub convergence_generation: u64,
    pub schedule_generation: u64,
    pub wants_frozen: bool,
    /// Whether the agent loop has reached the requested freeze state.
    pub converged: bool,
    pub interrupt_pending: bool,
    /// Milliseconds until the pending context may be delivered, if one is pending.
    pub pending_in_ms: Option<u64>,
}

pub struct NodeAgentContextManager<C = NodeAgentContext> {
    clock: Arc<dyn Clock>,
    state: Mutex<State<C>>,
    changed: Condvar,
}

impl<C: Send + Sync> NodeAgentContextManager<C> {
    pub fn new(initial: Arc<C>) -> Self {
        Self::with_clock(Arc::new(SystemClock), initial)
    }

    pub fn with_clock(clock: Arc<dyn Clock>, initial: Arc<C>) -> Self {
        Self {
            clock,
            state: Mutex::new(State {
                current: initial,
                slot: TimeGatedSlot::new(),
                tracker: ConvergenceTracker::new(),
                freeze: FreezeRequest {
                    frozen: false,
                    baseline: 0,
                },
                interrupt_pending: false,
            }),
            changed: Condvar::new(),
        }
    }

    /// Replace the pending context. It is delivered no earlier than `not_before`,
    /// and only to a `fetch_next_context` call that was already waiting.
    pub fn schedule(&self, context: Arc<C>, not_before: Instant) {
        let mut state = self.state.lock();
        let delay_ms = not_before
            .saturating_duration_since(self.clock.now())
            .as_millis() as u64;
        let generation = state.slot.put(context, not_before);
        debug!(generation, delay_ms, "Scheduled next context");
        self.changed.notify_all();
    }

    /// Schedule for delivery as soon as the agent loop asks.
    pub fn schedule_now(&self, context: Arc<C>) {
        self.schedule(context, self.clock.now());
    }

    /// Block until a context scheduled after this call started is due, then return it.
    ///
    /// Must only be called from one consumer thread at a time. Calling it again marks
    /// the previous tick as finished. While a freeze is requested nothing is delivered.
    /// Fails with [`ManagerError::Interrupted`] once [`Self::interrupt`] is observed,
    /// even if a context is ready at the same moment.
    pub fn fetch_next_context(&self) -> Result<Arc<C>, ManagerError> {
        let mut state = self.state.lock();
        let idle_generation = state.tracker.mark_idle();
        self.changed.notify_all();

        let baseline = state.slot.generation();
        debug!(
            convergence_generation = idle_generation,
            schedule_baseline = baseline,
            "Waiting for next context"
        );

        loop {
            if state.interrupt_pending {
                state.interrupt_pending = false;
                info!("Wait for next context interrupted");
                return Err(ManagerError::Interrupted);
            }

            if !state.freeze.frozen {
                let now = self.clock.now();
                let pending = state
                    .slot
                    .pending_after(baseline)
                    .map(|e| (e.is_ready(now), e.remaining(now)));
                if let Some((ready, remaining)) = pending {
                    if ready {
                        if let Some(entry) = state.slot.take() {
                            return Ok(self.deliver(&mut state, entry));
                        }
                    }
                    self.changed.wait_for(&mut state, remaining);
                    continue;
                }
            }

            self.changed.wait(&mut state);
        }
    }

    fn deliver(&self, state: &mut State<C>, entry: ScheduledEntry<C>) -> Arc<C> {
        state.current = Arc::clone(&entry.context);
        let generation = state.tracker.mark_active();
        self.changed.notify_all();
        debug!(
            schedule_generation = entry.generation,
            convergence_generation = generation,
            "Delivered next context"
        );
        entry.context
    }

    /// The context most recently delivered, or the initial one.
    pub fn current_context(&self) -> Arc<C> {
        Arc::clone(&self.state.lock().current)
    }

    /// Request the agent loop to be frozen (`true`) or running (`false`) and wait up to
    /// `timeout` for it to get there.
    ///
    /// Frozen means idle inside `fetch_next_context`; running means a context has
    /// been delivered since the loop was last idle. Returns `false` on timeout. A zero
    /// timeout checks once and returns. A timeout too large to express as an instant
    /// (e.g. `Duration::MAX`) waits without a deadline. Interrupts do not affect this wait.
    ///
    /// Concurrent callers asking for the same state share one request and all see the
    /// same convergence. A call asking for the opposite state replaces the request: a
    /// waiter whose request was replaced never reports success and returns `false` at
    /// its deadline.
    pub fn set_frozen(&self, frozen: bool, timeout: Duration) -> bool {
        let deadline = self.clock.now().checked_add(timeout);
        let mut state = self.state.lock();

        if state.freeze.frozen != frozen {
            let request = FreezeRequest::new(frozen, &state.tracker);
            state.freeze = request;
            info!(
                frozen,
                baseline = request.baseline,
                activity = state.tracker.activity().as_str(),
                "Freeze request changed"
            );
            self.changed.notify_all();
        }

        loop {
            // A later request in the other direction supersedes this one.
            if state.freeze.frozen == frozen
                && state.tracker.matches(frozen, state.freeze.baseline)
            {
                info!(
                    frozen,
                    convergence_generation = state.tracker.generation(),
                    "Agent loop converged to freeze request"
                );
                return true;
            }

            let Some(deadline) = deadline else {
                self.changed.wait(&mut state);
                continue;
            };
            let now = self.clock.now();
            if now >= deadline {
                if !timeout.is_zero() {
                    warn!(
                        frozen,
                        timeout_ms = timeout.as_millis() as u64,
                        activity = state.tracker.activity().as_str(),
                        "Timed out waiting for agent loop to converge"
                    );
                }
                return false;
            }
            self.changed.wait_for(&mut state, deadline - now);
        }
    }

    /// Wake the agent loop and make its pending or next `fetch_next_context` fail.
    ///
    /// The interrupt is consumed by the first call that observes it.
    pub fn interrupt(&self) {
        let mut state = self.state.lock();
        state.interrupt_pending = true;
        info!("Interrupt requested");
        self.changed.notify_all();
    }

    pub fn wants_frozen(&self) -> bool {
        self.state.lock().freeze.frozen
    }

    pub fn status(&self) -> ManagerStatus {
        let state = self.state.lock();
        let now = self.clock.now();
        ManagerStatus {
            activity: state.tracker.activity(),
            convergence_generation: state.tracker.generation(),
            schedule_generation: state.slot.generation(),
            wants_frozen: state.freeze.frozen,
            converged: state
                .tracker
                .matches(state.freeze.frozen, state.freeze.baseline),
            interrupt_pending: state.interrupt_pending,
            pending_in_ms: state
                .slot
                .peek()
                .map(|e| e.remaining(now).as_millis() as u64),
        }
    }
}

impl<C> fmt::Debug for NodeAgentContextManager<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeAgentContextManager").finish_non_exhaustive()
    }
}
