//! Agent loop and tick scheduler threads.
//!
//! The two sides of the context hand-off, each on its own named thread. The agent
//! loop exits when the manager is interrupted; the scheduler exits when stopped.

use crate::error::ManagerError;
use crate::nodeagent::manager::NodeAgentContextManager;
use std::io;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info};

/// The work the agent loop does for each delivered context.
pub trait Converger<C>: Send {
    fn converge(&mut self, context: &Arc<C>);
}

impl<C, F> Converger<C> for F
where
    F: FnMut(&Arc<C>) + Send,
{
    fn converge(&mut self, context: &Arc<C>) {
        self(context)
    }
}

pub struct AgentLoopHandle {
    handle: JoinHandle<u64>,
}

impl AgentLoopHandle {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the loop to exit and return the number of ticks it converged.
    pub fn join(self) -> thread::Result<u64> {
        self.handle.join()
    }
}

/// Run `converger` on every context the manager delivers until it is interrupted.
pub fn spawn_agent_loop<C, V>(
    manager: Arc<NodeAgentContextManager<C>>,
    mut converger: V,
) -> io::Result<AgentLoopHandle>
where
    C: Send + Sync + 'static,
    V: Converger<C> + 'static,
{
    let handle = thread::Builder::new()
        .name("node-agent".to_string())
        .spawn(move || {
            let mut ticks = 0u64;
            info!("Agent loop started");
            loop {
                match manager.fetch_next_context() {
                    Ok(context) => {
                        converger.converge(&context);
                        ticks += 1;
                        debug!(ticks, "Converged tick");
                    }
                    Err(ManagerError::Interrupted) => {
                        info!(ticks, "Agent loop stopped");
                        break ticks;
                    }
                }
            }
        })?;

    Ok(AgentLoopHandle { handle })
}

pub struct SchedulerHandle {
    stop: mpsc::Sender<()>,
    handle: JoinHandle<u64>,
}

impl SchedulerHandle {
    /// Stop scheduling and return the number of contexts scheduled.
    pub fn stop(self) -> thread::Result<u64> {
        // A send error means the thread is already gone; join reports why.
        let _ = self.stop.send(());
        self.handle.join()
    }
}

/// Schedule `source(tick)` for immediate delivery every `interval`, starting at once.
pub fn spawn_tick_scheduler<C, F>(
    manager: Arc<NodeAgentContextManager<C>>,
    interval: Duration,
    mut source: F,
) -> io::Result<SchedulerHandle>
where
    C: Send + Sync + 'static,
    F: FnMut(u64) -> Arc<C> + Send + 'static,
{
    let (stop, stopped) = mpsc::channel();
    let handle = thread::Builder::new()
        .name("tick-scheduler".to_string())
        .spawn(move || {
            let mut tick = 0u64;
            info!(interval_ms = interval.as_millis() as u64, "Tick scheduler started");
            loop {
                tick += 1;
                manager.schedule_now(source(tick));
                match stopped.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => continue,
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                        info!(scheduled = tick, "Tick scheduler stopped");
                        break tick;
                    }
                }
            }
        })?;

    Ok(SchedulerHandle { stop, handle })
}
