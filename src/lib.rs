//! Nodeadmin: Node Agent Context Hand-off
//!
//! Coordinates a node agent convergence loop with the scheduler that feeds it desired
//! state and with controllers that freeze it for maintenance. The core is
//! [`nodeagent::NodeAgentContextManager`].

pub mod cli;
pub mod clock;
pub mod config;
pub mod context;
pub mod error;
pub mod logging;
pub mod nodeagent;

pub use clock::{Clock, ManualClock, SystemClock};
pub use context::{NodeAgentContext, NodeAgentContextBuilder};
pub use error::{ConfigError, ManagerError};
pub use nodeagent::{Activity, ManagerStatus, NodeAgentContextManager};
