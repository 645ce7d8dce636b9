//! Configuration management for Convoy
//!
//! This module provides the run-level configuration: communication root,
//! monitor cadence, launch mode, and the external audit/test commands.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::Result;

/// Environment variable that forces the externally-managed launch mode
pub const EXTERNAL_AGENTS_ENV: &str = "CONVOY_EXTERNAL_AGENTS";

/// Run-level Convoy configuration
///
/// Loaded from `.convoy/config.toml` in the project root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvoyConfig {
    /// Root of the shared-filesystem communication channel
    #[serde(default = "default_comm_root")]
    pub comm_root: PathBuf,

    /// Directory containing per-agent workspace volumes
    #[serde(default = "default_workspaces_root")]
    pub workspaces_root: PathBuf,

    /// Monitor tick interval in seconds
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,

    /// Maximum monitor ticks before the run times out
    #[serde(default = "default_max_ticks")]
    pub max_ticks: u32,

    /// Emit a per-agent status line every N ticks
    #[serde(default = "default_report_every")]
    pub report_every: u32,

    /// Agents run as independently supervised containers; launch is a no-op
    #[serde(default)]
    pub external_agents: bool,

    /// Command spawned per agent in the locally-simulated launch mode
    #[serde(default = "default_agent_command")]
    pub agent_command: String,

    /// Reference document passed to locally spawned agents
    #[serde(default = "default_reference_doc")]
    pub reference_doc: String,

    /// Measurement command run before and after the fleet
    #[serde(default = "default_audit_command")]
    pub audit_command: String,

    /// Test suite command run after the fleet
    #[serde(default = "default_test_command")]
    pub test_command: String,

    /// Prefix prepended to an agent id to form its container name
    #[serde(default = "default_container_prefix")]
    pub container_prefix: String,
}

// Default value providers
fn default_comm_root() -> PathBuf {
    PathBuf::from("comms")
}

fn default_workspaces_root() -> PathBuf {
    PathBuf::from("workspaces")
}

fn default_tick_secs() -> u64 {
    30
}

fn default_max_ticks() -> u32 {
    120
}

fn default_report_every() -> u32 {
    4
}

fn default_agent_command() -> String {
    "scripts/agent-worker.sh".to_string()
}

fn default_reference_doc() -> String {
    "docs/security-playbook.md".to_string()
}

fn default_audit_command() -> String {
    "npm audit".to_string()
}

fn default_test_command() -> String {
    "npm test".to_string()
}

fn default_container_prefix() -> String {
    "convoy-".to_string()
}

impl ConvoyConfig {
    /// Load configuration from `.convoy/config.toml` or use defaults
    pub fn load_or_default(root: &Path) -> Result<Self> {
        let config_path = root.join(".convoy/config.toml");

        let config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content).map_err(|e| {
                crate::ConvoyError::Config(format!("Failed to parse config file: {}", e))
            })?
        } else {
            Self::default()
        };

        Ok(config.with_env_overrides())
    }

    /// Write default configuration to `.convoy/config.toml`
    pub fn write_default(root: &Path) -> Result<()> {
        let config_dir = root.join(".convoy");
        std::fs::create_dir_all(&config_dir)?;

        let config_path = config_dir.join("config.toml");
        let config = Self::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| crate::ConvoyError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    /// Apply environment overrides
    ///
    /// `CONVOY_EXTERNAL_AGENTS=1|true|yes` switches the launcher to the
    /// externally-managed mode regardless of the config file.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(value) = std::env::var(EXTERNAL_AGENTS_ENV) {
            self.external_agents = matches!(value.to_lowercase().as_str(), "1" | "true" | "yes");
        }
        self
    }

    /// Wall-clock timeout implied by the monitor cadence
    pub fn timeout_secs(&self) -> u64 {
        self.tick_secs * self.max_ticks as u64
    }
}

impl Default for ConvoyConfig {
    fn default() -> Self {
        Self {
            comm_root: default_comm_root(),
            workspaces_root: default_workspaces_root(),
            tick_secs: default_tick_secs(),
            max_ticks: default_max_ticks(),
            report_every: default_report_every(),
            external_agents: false,
            agent_command: default_agent_command(),
            reference_doc: default_reference_doc(),
            audit_command: default_audit_command(),
            test_command: default_test_command(),
            container_prefix: default_container_prefix(),
        }
    }
}
