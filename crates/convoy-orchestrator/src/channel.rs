//! Shared-filesystem communication channel
//!
//! The channel is the sole IPC mechanism between the orchestrator and its
//! agents. Agents own their status files and progress logs; the
//! orchestrator owns the directory structure and only ever reads agent
//! output. A torn or partial status read is treated as "status
//! unavailable this tick", never as an error.

use convoy_core::{AgentDescriptor, AgentStatus, Result, TaskSpec};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Handle to the communication directory tree for one run
#[derive(Debug, Clone)]
pub struct CommunicationChannel {
    root: PathBuf,
}

impl CommunicationChannel {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the per-agent subtrees plus the shared roots
    ///
    /// Idempotent; calling it twice produces the same directory set.
    /// Filesystem errors here are fatal to the whole run.
    pub fn ensure_channels(&self, agents: &[AgentDescriptor]) -> Result<()> {
        for shared in ["prompts", "tasks", "snapshots"] {
            std::fs::create_dir_all(self.root.join(shared))?;
        }

        for agent in agents {
            for tree in ["progress", "handoffs", "blockers"] {
                std::fs::create_dir_all(self.root.join(tree).join(&agent.id))?;
            }
        }

        debug!("Communication channels ready under {:?}", self.root);
        Ok(())
    }

    /// `progress/<id>/metrics.json`, written by the agent
    pub fn status_file(&self, agent_id: &str) -> PathBuf {
        self.root.join("progress").join(agent_id).join("metrics.json")
    }

    /// `progress/<id>/progress.md`, the agent's append-only log
    pub fn progress_log(&self, agent_id: &str) -> PathBuf {
        self.root.join("progress").join(agent_id).join("progress.md")
    }

    /// `prompts/<id>.md`, the generated instruction document
    pub fn prompt_path(&self, agent_id: &str) -> PathBuf {
        self.root.join("prompts").join(format!("{}.md", agent_id))
    }

    /// `tasks/<name>.json`
    pub fn task_path(&self, name: &str) -> PathBuf {
        self.root.join("tasks").join(format!("{}.json", name))
    }

    /// `snapshots/` root shared by all agents
    pub fn snapshots_root(&self) -> PathBuf {
        self.root.join("snapshots")
    }

    /// `<label>-audit.txt` raw measurement capture
    pub fn audit_capture(&self, label: &str) -> PathBuf {
        self.root.join(format!("{}-audit.txt", label))
    }

    /// `merge-<run>.sh` generated integration script
    pub fn merge_script(&self, run_id: &str) -> PathBuf {
        self.root.join(format!("merge-{}.sh", run_id))
    }

    /// Read an agent's status file
    ///
    /// Absence, a torn write, or malformed JSON all default to waiting;
    /// the next tick retries with a fresh read.
    pub fn read_status(&self, agent_id: &str) -> AgentStatus {
        let path = self.status_file(agent_id);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(_) => return AgentStatus::waiting(),
        };

        match serde_json::from_str(&content) {
            Ok(status) => status,
            Err(e) => {
                debug!("Unreadable status for {} ({}); treating as waiting", agent_id, e);
                AgentStatus::waiting()
            }
        }
    }

    /// Load an agent's task spec, if present
    ///
    /// A missing or malformed spec is a soft skip for that agent, not a
    /// run failure.
    pub fn load_task_spec(&self, name: &str) -> Option<TaskSpec> {
        let path = self.task_path(name);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(_) => {
                warn!("No task spec at {:?}", path);
                return None;
            }
        };

        match serde_json::from_str(&content) {
            Ok(spec) => Some(spec),
            Err(e) => {
                warn!("Malformed task spec {:?}: {}", path, e);
                None
            }
        }
    }

    /// Last `n` lines of an agent's progress log, or `None` if absent
    pub fn progress_tail(&self, agent_id: &str, n: usize) -> Option<String> {
        let content = std::fs::read_to_string(self.progress_log(agent_id)).ok()?;
        let lines: Vec<&str> = content.lines().collect();
        let start = lines.len().saturating_sub(n);
        Some(lines[start..].join("\n"))
    }
}
