//! Container command execution abstraction

use async_trait::async_trait;
use convoy_core::{ConvoyError, Result};
use std::process::Output;
use std::sync::{Arc, Mutex};
use tokio::process::Command;
use tracing::debug;

/// Output from a container runtime command
#[derive(Debug, Clone)]
pub struct ContainerOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
}

impl ContainerOutput {
    /// Successful output with no text, the common case for mocks
    pub fn ok() -> Self {
        Self {
            stdout: String::new(),
            stderr: String::new(),
            success: true,
        }
    }

    pub fn ok_with(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            success: true,
        }
    }

    pub fn failed(stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            success: false,
        }
    }
}

impl From<Output> for ContainerOutput {
    fn from(output: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
        }
    }
}

/// Trait for executing container runtime commands (allows mocking in tests)
#[async_trait]
pub trait ContainerExecutor: Send + Sync {
    /// Execute a runtime command with the given arguments
    async fn exec(&self, args: &[&str]) -> Result<ContainerOutput>;
}

/// Real docker CLI executor
#[derive(Debug, Clone, Default)]
pub struct DockerCli;

impl DockerCli {
    pub fn new() -> Self {
        Self
    }

    /// Check whether a docker daemon is reachable
    pub async fn available() -> bool {
        Command::new("docker")
            .args(["version", "--format", "{{.Server.Version}}"])
            .output()
            .await
            .map(|out| out.status.success())
            .unwrap_or(false)
    }
}

#[async_trait]
impl ContainerExecutor for DockerCli {
    async fn exec(&self, args: &[&str]) -> Result<ContainerOutput> {
        debug!("Executing docker {:?}", args);

        let output = Command::new("docker")
            .args(args)
            .output()
            .await
            .map_err(|e| ConvoyError::Container(format!("Failed to execute docker: {}", e)))?;

        let container_output = ContainerOutput::from(output);

        if !container_output.success {
            debug!("Docker command failed: {}", container_output.stderr);
        }

        Ok(container_output)
    }
}

/// Mock container executor for testing
///
/// Every call is recorded in order; responses default to success unless a
/// specific one has been queued for the command. The recorded sequence is
/// what recovery-ordering tests assert against.
#[derive(Clone, Default)]
pub struct MockContainerExecutor {
    responses: std::collections::HashMap<String, ContainerOutput>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockContainerExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(mut self, command: &str, output: ContainerOutput) -> Self {
        self.responses.insert(command.to_string(), output);
        self
    }

    /// Commands executed so far, in order, as joined argument strings
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("mock call log poisoned").clone()
    }
}

#[async_trait]
impl ContainerExecutor for MockContainerExecutor {
    async fn exec(&self, args: &[&str]) -> Result<ContainerOutput> {
        let key = args.join(" ");
        self.calls
            .lock()
            .expect("mock call log poisoned")
            .push(key.clone());

        Ok(self
            .responses
            .get(&key)
            .cloned()
            .unwrap_or_else(ContainerOutput::ok))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_executor_defaults_to_success() {
        let executor = MockContainerExecutor::new();
        let output = executor.exec(&["restart", "convoy-crypto"]).await.unwrap();
        assert!(output.success);
        assert_eq!(executor.calls(), vec!["restart convoy-crypto"]);
    }

    #[tokio::test]
    async fn test_mock_executor_queued_failure() {
        let executor = MockContainerExecutor::new()
            .with_response("stop convoy-crypto", ContainerOutput::failed("no such container"));

        let output = executor.exec(&["stop", "convoy-crypto"]).await.unwrap();
        assert!(!output.success);
        assert_eq!(output.stderr, "no such container");
    }

    #[tokio::test]
    async fn test_mock_executor_records_order() {
        let executor = MockContainerExecutor::new();
        executor.exec(&["stop", "a"]).await.unwrap();
        executor.exec(&["start", "a"]).await.unwrap();

        assert_eq!(executor.calls(), vec!["stop a", "start a"]);
    }
}
