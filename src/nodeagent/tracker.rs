//! Consumer activity tracking.
//!
//! Every idle/active transition of the agent loop bumps a generation counter, which
//! lets a freeze waiter tell a transition it is waiting for apart from a state that
//! was already in place.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activity {
    /// Blocked waiting for the next context, or not started yet.
    Idle,
    /// Holding a delivered context and converging on it.
    Active,
}

impl Activity {
    /// The activity a freeze (`true`) or unfreeze (`false`) request waits for.
    pub fn target(want_frozen: bool) -> Self {
        if want_frozen {
            Activity::Idle
        } else {
            Activity::Active
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Activity::Idle => "idle",
            Activity::Active => "active",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConvergenceTracker {
    activity: Activity,
    generation: u64,
}

impl Default for ConvergenceTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ConvergenceTracker {
    pub fn new() -> Self {
        Self {
            activity: Activity::Idle,
            generation: 0,
        }
    }

    pub fn mark_idle(&mut self) -> u64 {
        self.transition(Activity::Idle)
    }

    pub fn mark_active(&mut self) -> u64 {
        self.transition(Activity::Active)
    }

    fn transition(&mut self, activity: Activity) -> u64 {
        self.activity = activity;
        self.generation += 1;
        self.generation
    }

    /// True if the consumer is in the state `want_frozen` asks for and got there
    /// after `baseline`.
    pub fn matches(&self, want_frozen: bool, baseline: u64) -> bool {
        self.activity == Activity::target(want_frozen) && self.generation > baseline
    }

    pub fn activity(&self) -> Activity {
        self.activity
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}
