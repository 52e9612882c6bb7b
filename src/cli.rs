//! Command-line interface: argument parsing and command execution.

use crate::config::{AgentConfig, ConfigLoader, NodeAdminConfig};
use crate::context::{NodeAgentContext, NodeAgentContextBuilder};
use crate::logging::LoggingConfig;
use crate::nodeagent::{spawn_agent_loop, spawn_tick_scheduler, NodeAgentContextManager};
use anyhow::{anyhow, bail, Context as _};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "nodeadmin", version, about = "Drive a node agent loop with freeze control")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true, default_value = "false")]
    pub verbose: bool,

    /// Disable logging
    #[arg(long, global = true, default_value = "false")]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long, global = true)]
    pub log_format: Option<String>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Run the agent loop, freeze it halfway through, then resume it
    Run {
        /// Ticks to converge before shutting down
        #[arg(long, default_value_t = 6)]
        ticks: u64,
    },
    /// Print the effective configuration
    Config,
}

impl Cli {
    pub fn load_config(&self) -> anyhow::Result<NodeAdminConfig> {
        ConfigLoader::load(self.config.as_deref()).context("Failed to load configuration")
    }

    /// Apply logging flags on top of the configured logging section.
    /// Explicit flags win over --verbose.
    pub fn logging_config(&self, base: &LoggingConfig) -> LoggingConfig {
        let mut config = base.clone();
        if self.quiet {
            config.enabled = false;
        }
        if self.verbose {
            config.level = "debug".to_string();
        }
        if let Some(ref level) = self.log_level {
            config.level = level.clone();
        }
        if let Some(ref format) = self.log_format {
            config.format = format.clone();
        }
        config
    }

    pub fn execute(&self, config: &NodeAdminConfig) -> anyhow::Result<String> {
        match self.command {
            Commands::Run { ticks } => run(config, ticks),
            Commands::Config => Ok(config.to_toml()?),
        }
    }
}

/// Run the loop until `ticks` contexts were converged, freezing and unfreezing it once
/// along the way. Returns a JSON report.
pub fn run(config: &NodeAdminConfig, ticks: u64) -> anyhow::Result<String> {
    if ticks == 0 {
        bail!("--ticks must be at least 1");
    }
    config.validate()?;

    let agent = &config.agent;
    let deadline = Instant::now()
        .checked_add(run_budget(agent, ticks)?)
        .ok_or_else(|| anyhow!("Run budget exceeds the clock range"))?;

    let hostname = agent.hostname.clone();
    let manager = Arc::new(NodeAgentContextManager::new(
        NodeAgentContextBuilder::new(hostname.clone()).build(),
    ));

    let converge_time = agent.converge_time();
    let agent_loop = spawn_agent_loop(
        Arc::clone(&manager),
        move |context: &Arc<NodeAgentContext>| {
            info!(tick = context.tick(), hostname = context.hostname(), "Converging");
            thread::sleep(converge_time);
        },
    )?;
    let scheduler = spawn_tick_scheduler(Arc::clone(&manager), agent.tick_interval(), move |tick| {
        NodeAgentContextBuilder::new(hostname.clone())
            .tick(tick)
            .build()
    })?;

    wait_for_tick(&manager, ticks.div_ceil(2), deadline)?;
    let frozen = manager.set_frozen(true, agent.freeze_timeout());
    let frozen_status = manager.status();
    info!(frozen, "Freeze requested");

    // Ticks keep being scheduled while frozen; none may be delivered
    thread::sleep(agent.tick_interval() * 2);
    let tick_while_frozen = manager.current_context().tick();

    let unfrozen = manager.set_frozen(false, agent.freeze_timeout() + agent.tick_interval());
    info!(unfrozen, "Unfreeze requested");
    wait_for_tick(&manager, ticks, deadline)?;

    let scheduled = scheduler
        .stop()
        .map_err(|_| anyhow!("Tick scheduler thread panicked"))?;
    manager.interrupt();
    let converged = agent_loop
        .join()
        .map_err(|_| anyhow!("Agent loop thread panicked"))?;

    let report = json!({
        "finished_at": chrono::Utc::now().to_rfc3339(),
        "hostname": agent.hostname,
        "scheduled": scheduled,
        "converged": converged,
        "last_tick": manager.current_context().tick(),
        "freeze": {
            "converged": frozen,
            "status": frozen_status,
            "tick_while_frozen": tick_while_frozen,
        },
        "unfreeze": {
            "converged": unfrozen,
        },
        "status": manager.status(),
    });
    Ok(serde_json::to_string_pretty(&report)?)
}

/// Time allowed for the whole run. Every tick needs at most one interval plus its
/// convergence time, and the freeze and unfreeze waits get their own timeout.
fn run_budget(agent: &AgentConfig, ticks: u64) -> anyhow::Result<Duration> {
    let rounds = ticks
        .checked_add(2)
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| anyhow!("--ticks {} is too large", ticks))?;
    let budget = agent
        .tick_interval()
        .checked_add(agent.converge_time())
        .and_then(|per_tick| per_tick.checked_mul(rounds))
        .and_then(|total| total.checked_add(agent.freeze_timeout().checked_mul(2)?));
    match budget {
        Some(budget) => Ok(budget),
        None => bail!("Run budget overflows for {} ticks", ticks),
    }
}

fn wait_for_tick(
    manager: &NodeAgentContextManager,
    tick: u64,
    deadline: Instant,
) -> anyhow::Result<()> {
    while manager.current_context().tick() < tick {
        if Instant::now() >= deadline {
            bail!(
                "Agent loop did not reach tick {} in time (at tick {})",
                tick,
                manager.current_context().tick()
            );
        }
        thread::sleep(Duration::from_millis(10));
    }
    Ok(())
}
