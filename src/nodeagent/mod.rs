//! Node agent context hand-off: the manager, its building blocks, and the threads
//! that drive it.

pub mod manager;
pub mod runner;
pub mod slot;
pub mod tracker;

pub use manager::{ManagerStatus, NodeAgentContextManager};
pub use runner::{spawn_agent_loop, spawn_tick_scheduler, AgentLoopHandle, Converger, SchedulerHandle};
pub use slot::{ScheduledEntry, TimeGatedSlot};
pub use tracker::{Activity, ConvergenceTracker};
