//! Parallel fleet launcher
//!
//! Every agent is launched concurrently; the fan-out is gathered without
//! short-circuiting, so one failed launch never blocks or cancels the
//! others. Launch is fire-and-forget in both modes: a success means the
//! start command was accepted, nothing more.

use convoy_core::{AgentDescriptor, ConvoyConfig, LaunchResult};
use futures::future::join_all;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{info, warn};

/// Environment variables passed to locally spawned agents
pub const AGENT_ID_ENV: &str = "CONVOY_AGENT_ID";
pub const REFERENCE_DOC_ENV: &str = "CONVOY_REFERENCE_DOC";

/// Launch every registered agent concurrently
///
/// Returns exactly one [`LaunchResult`] per agent, in registry order,
/// after all launch attempts have settled.
pub async fn launch_all(agents: &[AgentDescriptor], config: &ConvoyConfig) -> Vec<LaunchResult> {
    let handles: Vec<_> = agents
        .iter()
        .map(|agent| {
            let agent_id = agent.id.clone();
            let external = config.external_agents;
            let command = config.agent_command.clone();
            let reference = config.reference_doc.clone();

            tokio::spawn(async move {
                if external {
                    // Agents already run as independently supervised
                    // containers; nothing to start from here.
                    info!("Agent {} externally managed; launch is a no-op", agent_id);
                    LaunchResult::ok(agent_id)
                } else {
                    spawn_local(&agent_id, &command, &reference)
                }
            })
        })
        .collect();

    let mut results = Vec::with_capacity(agents.len());
    for (agent, joined) in agents.iter().zip(join_all(handles).await) {
        match joined {
            Ok(result) => results.push(result),
            Err(e) => results.push(LaunchResult::failed(
                agent.id.clone(),
                format!("launch task panicked: {}", e),
            )),
        }
    }

    for result in results.iter().filter(|r| !r.is_ok()) {
        warn!(
            "Launch failed for {}: {}",
            result.agent_id,
            result.outcome.as_ref().unwrap_err()
        );
    }

    results
}

/// Spawn one detached agent subprocess
///
/// The child is handed its id and the reference document via environment
/// and is never waited on; the orchestrator does not own its lifetime.
fn spawn_local(agent_id: &str, command: &str, reference_doc: &str) -> LaunchResult {
    let spawned = Command::new(command)
        .env(AGENT_ID_ENV, agent_id)
        .env(REFERENCE_DOC_ENV, reference_doc)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn();

    match spawned {
        Ok(child) => {
            info!(
                "Spawned agent {} (pid {:?})",
                agent_id,
                child.id()
            );
            // Not awaited; the orchestrator does not own the agent's lifetime.
            drop(child);
            LaunchResult::ok(agent_id)
        }
        Err(e) => LaunchResult::failed(agent_id, format!("spawn failed: {}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use convoy_core::AgentRole;

    fn roster() -> Vec<AgentDescriptor> {
        vec![
            AgentDescriptor::new("crypto", AgentRole::Security, "/w/crypto", "crypto", 1),
            AgentDescriptor::new("storage", AgentRole::Services, "/w/storage", "storage", 2),
            AgentDescriptor::new("screens", AgentRole::Interface, "/w/screens", "screens", 3),
        ]
    }

    #[tokio::test]
    async fn test_external_mode_is_noop_success() {
        let config = ConvoyConfig {
            external_agents: true,
            ..ConvoyConfig::default()
        };

        let results = launch_all(&roster(), &config).await;
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.is_ok()));
    }

    #[tokio::test]
    async fn test_failed_launches_are_independent() {
        // A command that cannot exist: every spawn fails, but each agent
        // still gets its own settled result.
        let config = ConvoyConfig {
            external_agents: false,
            agent_command: "/nonexistent/convoy-agent-binary".to_string(),
            ..ConvoyConfig::default()
        };

        let agents = roster();
        let results = launch_all(&agents, &config).await;

        assert_eq!(results.len(), agents.len());
        for (agent, result) in agents.iter().zip(&results) {
            assert_eq!(result.agent_id, agent.id);
            assert!(!result.is_ok());
        }
    }

    #[tokio::test]
    async fn test_local_mode_spawn_success() {
        let config = ConvoyConfig {
            external_agents: false,
            agent_command: "true".to_string(),
            ..ConvoyConfig::default()
        };

        let results = launch_all(&roster(), &config).await;
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.is_ok()));
    }
}
