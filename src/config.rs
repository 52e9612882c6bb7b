//! Configuration System
//!
//! Layered configuration: built-in defaults, the user-level config file, an explicit
//! config file, then `NODEADMIN_*` environment variables (`__` separates sections,
//! e.g. `NODEADMIN_AGENT__TICK_INTERVAL_MS=500`).

use crate::error::ConfigError;
use crate::logging::LoggingConfig;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeAdminConfig {
    #[serde(default)]
    pub agent: AgentConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Agent loop timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Hostname stamped on every context
    #[serde(default = "default_hostname")]
    pub hostname: String,

    /// How often the scheduler hands over a new context
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Simulated convergence work per tick
    #[serde(default = "default_converge_ms")]
    pub converge_ms: u64,

    /// How long freeze and unfreeze requests wait for the loop
    #[serde(default = "default_freeze_timeout_ms")]
    pub freeze_timeout_ms: u64,
}

/// Upper bound for every duration setting: one day.
pub const MAX_DURATION_MS: u64 = 24 * 60 * 60 * 1000;

fn default_hostname() -> String {
    "localhost".to_string()
}

fn default_tick_interval_ms() -> u64 {
    1000
}

fn default_converge_ms() -> u64 {
    200
}

fn default_freeze_timeout_ms() -> u64 {
    5000
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            hostname: default_hostname(),
            tick_interval_ms: default_tick_interval_ms(),
            converge_ms: default_converge_ms(),
            freeze_timeout_ms: default_freeze_timeout_ms(),
        }
    }
}

impl AgentConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hostname.trim().is_empty() {
            return Err(ConfigError::Invalid("agent.hostname cannot be empty".to_string()));
        }
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "agent.tick_interval_ms must be greater than zero".to_string(),
            ));
        }
        for (name, value) in [
            ("tick_interval_ms", self.tick_interval_ms),
            ("converge_ms", self.converge_ms),
            ("freeze_timeout_ms", self.freeze_timeout_ms),
        ] {
            if value > MAX_DURATION_MS {
                return Err(ConfigError::Invalid(format!(
                    "agent.{} must be at most {} (got {})",
                    name, MAX_DURATION_MS, value
                )));
            }
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn converge_time(&self) -> Duration {
        Duration::from_millis(self.converge_ms)
    }

    pub fn freeze_timeout(&self) -> Duration {
        Duration::from_millis(self.freeze_timeout_ms)
    }
}

impl NodeAdminConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.agent.validate()
    }

    /// Render as TOML, the format the config files are read in.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Path to the user-level config file, e.g. ~/.config/nodeadmin/config.toml
pub fn global_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "nodeadmin")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, config::ConfigError> {
    let agent = AgentConfig::default();
    Config::builder()
        .set_default("agent.hostname", agent.hostname)?
        .set_default("agent.tick_interval_ms", agent.tick_interval_ms)?
        .set_default("agent.converge_ms", agent.converge_ms)?
        .set_default("agent.freeze_timeout_ms", agent.freeze_timeout_ms)
}

fn environment() -> Environment {
    Environment::with_prefix("NODEADMIN")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load defaults, the global file if present, `explicit` if given, then environment.
    pub fn load(explicit: Option<&Path>) -> Result<NodeAdminConfig, ConfigError> {
        let mut builder = builder_with_defaults()?;

        if let Some(global) = global_config_path() {
            if global.exists() {
                debug!(config_path = %global.display(), "Loading global configuration");
                builder = builder.add_source(File::from(global).required(false));
            }
        }

        if let Some(path) = explicit {
            if !path.exists() {
                warn!(config_path = %path.display(), "Configuration file not found");
            }
            builder = builder.add_source(File::from(path).required(true));
        }

        Self::finish(builder.add_source(environment()))
    }

    /// Load defaults and a single file, ignoring the global file and environment.
    pub fn load_from_file(path: &Path) -> Result<NodeAdminConfig, ConfigError> {
        let builder = builder_with_defaults()?.add_source(File::from(path).required(true));
        Self::finish(builder)
    }

    fn finish(builder: ConfigBuilder<DefaultState>) -> Result<NodeAdminConfig, ConfigError> {
        let config: NodeAdminConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}
