//! Node Agent Context
//!
//! Immutable snapshot of the desired state for one convergence tick. Contexts are
//! shared as `Arc<NodeAgentContext>` and compared by identity: two contexts built
//! from identical inputs are still different ticks.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// Desired per-node state handed to the agent loop.
pub struct NodeAgentContext {
    hostname: String,
    tick: u64,
    wants_frozen: bool,
    created_at: Instant,
}

impl NodeAgentContext {
    pub fn builder(hostname: impl Into<String>) -> NodeAgentContextBuilder {
        NodeAgentContextBuilder::new(hostname)
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Sequence number stamped by whoever built the context.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Freeze intent recorded by the builder. The manager passes it through untouched.
    pub fn wants_frozen(&self) -> bool {
        self.wants_frozen
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Identity comparison.
    pub fn same(a: &Arc<Self>, b: &Arc<Self>) -> bool {
        Arc::ptr_eq(a, b)
    }
}

impl fmt::Debug for NodeAgentContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeAgentContext")
            .field("hostname", &self.hostname)
            .field("tick", &self.tick)
            .field("wants_frozen", &self.wants_frozen)
            .finish_non_exhaustive()
    }
}

/// Builder for [`NodeAgentContext`].
#[derive(Debug, Clone)]
pub struct NodeAgentContextBuilder {
    hostname: String,
    tick: u64,
    wants_frozen: bool,
}

impl NodeAgentContextBuilder {
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            tick: 0,
            wants_frozen: false,
        }
    }

    pub fn tick(mut self, tick: u64) -> Self {
        self.tick = tick;
        self
    }

    pub fn wants_frozen(mut self, wants_frozen: bool) -> Self {
        self.wants_frozen = wants_frozen;
        self
    }

    pub fn build(self) -> Arc<NodeAgentContext> {
        Arc::new(NodeAgentContext {
            hostname: self.hostname,
            tick: self.tick,
            wants_frozen: self.wants_frozen,
            created_at: Instant::now(),
        })
    }
}
