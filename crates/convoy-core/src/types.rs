//! Core type definitions for Convoy orchestration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Role category for an agent
///
/// Roles select the fixed instruction block in the generated prompt; they
/// have no effect on scheduling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    /// Cryptography and credential handling fixes
    Security,
    /// Data/service layer fixes
    Services,
    /// UI screen fixes
    Interface,
    /// Regression test authoring
    Testing,
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Security => write!(f, "security"),
            Self::Services => write!(f, "services"),
            Self::Interface => write!(f, "interface"),
            Self::Testing => write!(f, "testing"),
        }
    }
}

impl std::str::FromStr for AgentRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "security" => Ok(Self::Security),
            "services" => Ok(Self::Services),
            "interface" => Ok(Self::Interface),
            "testing" => Ok(Self::Testing),
            _ => Err(format!("Invalid agent role: {}", s)),
        }
    }
}

/// Observed lifecycle state of an agent
///
/// The ordering is the lifecycle order; the monitor never lets an agent
/// regress to an earlier state once a later one has been observed.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum AgentState {
    #[default]
    Waiting,
    Running,
    Complete,
}

impl std::fmt::Display for AgentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Waiting => write!(f, "waiting"),
            Self::Running => write!(f, "running"),
            Self::Complete => write!(f, "complete"),
        }
    }
}

impl std::str::FromStr for AgentState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "waiting" => Ok(Self::Waiting),
            "running" => Ok(Self::Running),
            "complete" => Ok(Self::Complete),
            _ => Err(format!("Invalid agent state: {}", s)),
        }
    }
}

/// Status file contents, written by the agent into
/// `progress/<id>/metrics.json` and only ever read by the orchestrator
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentStatus {
    /// Completion percentage, 0-100
    #[serde(default)]
    pub completion: u8,
    /// Lifecycle state
    #[serde(default)]
    pub status: AgentState,
}

impl AgentStatus {
    /// The status assumed when no file exists (or a read is torn)
    pub fn waiting() -> Self {
        Self::default()
    }

    pub fn is_complete(&self) -> bool {
        self.status == AgentState::Complete
    }
}

/// Immutable descriptor for one agent in the fleet
///
/// Built once by the registry at process start; never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentDescriptor {
    /// Unique agent id (also the compose service name)
    pub id: String,
    /// Role category
    pub role: AgentRole,
    /// Workspace volume path
    pub workspace: PathBuf,
    /// Task spec file name under `tasks/` (without extension)
    pub task_spec: String,
    /// Ordinal priority; informational only, does not affect scheduling
    pub priority: u8,
}

impl AgentDescriptor {
    pub fn new(
        id: impl Into<String>,
        role: AgentRole,
        workspace: impl Into<PathBuf>,
        task_spec: impl Into<String>,
        priority: u8,
    ) -> Self {
        Self {
            id: id.into(),
            role,
            workspace: workspace.into(),
            task_spec: task_spec.into(),
            priority,
        }
    }
}

/// Per-agent task specification, read from `tasks/<name>.json`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskSpec {
    /// Path to the reference document the agent should follow
    #[serde(default)]
    pub reference: String,
    /// Files the agent is expected to modify
    #[serde(default)]
    pub files_to_fix: Vec<String>,
    /// Named patterns to apply to those files
    #[serde(default)]
    pub patterns_to_apply: Vec<String>,
}

/// Recovery operation selector
///
/// Closed set; anything else is rejected at the CLI boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecoveryMode {
    /// Restart the container in place
    Restart,
    /// Roll the workspace back to the latest snapshot
    Restore,
    /// Back up, then remove the container and rebuild its image
    Rebuild,
}

impl std::fmt::Display for RecoveryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Restart => write!(f, "restart"),
            Self::Restore => write!(f, "restore"),
            Self::Rebuild => write!(f, "rebuild"),
        }
    }
}

impl std::str::FromStr for RecoveryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "restart" => Ok(Self::Restart),
            "restore" => Ok(Self::Restore),
            "rebuild" => Ok(Self::Rebuild),
            _ => Err(format!("Unknown recovery type: {}", s)),
        }
    }
}

/// Outcome of one launch attempt
///
/// A successful outcome means the start command was accepted, not that the
/// agent has begun useful work.
#[derive(Debug, Clone)]
pub struct LaunchResult {
    pub agent_id: String,
    pub outcome: std::result::Result<(), String>,
}

impl LaunchResult {
    pub fn ok(agent_id: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            outcome: Ok(()),
        }
    }

    pub fn failed(agent_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            outcome: Err(reason.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }
}
