//! Per-agent container operations

use convoy_core::{ConvoyError, Result};
use tracing::{debug, info};

use crate::command::{ContainerExecutor, ContainerOutput};

/// Wraps a [`ContainerExecutor`] with the operations recovery needs
///
/// A container is addressed as `<prefix><agent-id>`; the compose service
/// name is the bare agent id.
pub struct ContainerManager<E: ContainerExecutor> {
    executor: E,
    prefix: String,
}

impl<E: ContainerExecutor> ContainerManager<E> {
    pub fn new(executor: E, prefix: impl Into<String>) -> Self {
        Self {
            executor,
            prefix: prefix.into(),
        }
    }

    /// Container name for an agent id
    pub fn container_name(&self, agent_id: &str) -> String {
        format!("{}{}", self.prefix, agent_id)
    }

    async fn run(&self, args: &[&str]) -> Result<ContainerOutput> {
        let output = self.executor.exec(args).await?;
        if !output.success {
            return Err(ConvoyError::Container(format!(
                "docker {} failed: {}",
                args.join(" "),
                output.stderr.trim()
            )));
        }
        Ok(output)
    }

    /// Restart the agent's container in place
    pub async fn restart(&self, agent_id: &str) -> Result<()> {
        let name = self.container_name(agent_id);
        info!("Restarting container {}", name);
        self.run(&["restart", &name]).await?;
        Ok(())
    }

    /// Stop the agent's container
    pub async fn stop(&self, agent_id: &str) -> Result<()> {
        let name = self.container_name(agent_id);
        info!("Stopping container {}", name);
        self.run(&["stop", &name]).await?;
        Ok(())
    }

    /// Start the agent's container
    pub async fn start(&self, agent_id: &str) -> Result<()> {
        let name = self.container_name(agent_id);
        info!("Starting container {}", name);
        self.run(&["start", &name]).await?;
        Ok(())
    }

    /// Remove the agent's container
    pub async fn remove(&self, agent_id: &str) -> Result<()> {
        let name = self.container_name(agent_id);
        info!("Removing container {}", name);
        self.run(&["rm", &name]).await?;
        Ok(())
    }

    /// Rebuild the agent's image via compose
    pub async fn build(&self, agent_id: &str) -> Result<()> {
        info!("Rebuilding image for service {}", agent_id);
        self.run(&["compose", "build", agent_id]).await?;
        Ok(())
    }

    /// Bring the agent's service up detached via compose
    pub async fn up(&self, agent_id: &str) -> Result<()> {
        info!("Bringing service {} up", agent_id);
        self.run(&["compose", "up", "-d", agent_id]).await?;
        Ok(())
    }

    /// Human-readable container status, or "not running" when absent
    pub async fn status(&self, agent_id: &str) -> Result<String> {
        let name = self.container_name(agent_id);
        let filter = format!("name={}", name);
        let output = self
            .executor
            .exec(&["ps", "-a", "--filter", &filter, "--format", "{{.Status}}"])
            .await?;

        if !output.success {
            debug!("Status query failed for {}: {}", name, output.stderr);
            return Err(ConvoyError::Container(format!(
                "status query failed: {}",
                output.stderr.trim()
            )));
        }

        let status = output.stdout.trim();
        if status.is_empty() {
            Ok("not running".to_string())
        } else {
            Ok(status.to_string())
        }
    }
}
