//! Recovery operations for a single misbehaving agent
//!
//! Three mutually exclusive operations, invoked out-of-band from the main
//! run:
//! - `restart`: bounce the container in place
//! - `restore`: roll the workspace back to the latest snapshot
//! - `rebuild`: back up, then tear the container down and rebuild it
//!
//! Ordering invariants:
//! - restore: stop container → delete workspace → copy workspace back →
//!   copy progress log back → start container. The container must never
//!   observe a partially-restored workspace.
//! - rebuild: the backup snapshot is created before any destructive step;
//!   a rebuild can never destroy the only copy of an agent's state.
//!
//! Container command failures are fatal to the single invocation and
//! propagate immediately; no partial cleanup is attempted.

use chrono::Local;
use convoy_core::{AgentDescriptor, RecoveryMode, Result};
use convoy_container::{ContainerExecutor, ContainerManager};
use std::io::Write;
use tracing::{info, warn};

use crate::channel::CommunicationChannel;
use crate::snapshot::{copy_dir_all, SnapshotStore};

/// Drives recovery for individual agents
///
/// The caller must ensure the agent is not concurrently mutating its own
/// workspace; the manager does not lock.
pub struct RecoveryManager<E: ContainerExecutor> {
    containers: ContainerManager<E>,
    channel: CommunicationChannel,
    snapshots: SnapshotStore,
}

impl<E: ContainerExecutor> RecoveryManager<E> {
    pub fn new(containers: ContainerManager<E>, channel: CommunicationChannel) -> Self {
        let snapshots = SnapshotStore::new(channel.snapshots_root());
        Self {
            containers,
            channel,
            snapshots,
        }
    }

    /// Run one recovery operation, then report the agent's state
    pub async fn recover(&self, agent: &AgentDescriptor, mode: RecoveryMode) -> Result<()> {
        info!("Recovery ({}) for agent {}", mode, agent.id);

        match mode {
            RecoveryMode::Restart => self.restart(agent).await?,
            RecoveryMode::Restore => self.restore(agent).await?,
            RecoveryMode::Rebuild => self.rebuild(agent).await?,
        }

        self.report(agent).await;
        Ok(())
    }

    /// Restart the container in place and note it in the progress log
    async fn restart(&self, agent: &AgentDescriptor) -> Result<()> {
        self.containers.restart(&agent.id).await?;

        let line = format!(
            "[{}] container restarted by recovery\n",
            Local::now().format("%Y-%m-%d %H:%M:%S")
        );
        let log = self.channel.progress_log(&agent.id);
        if let Some(parent) = log.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log)?;
        file.write_all(line.as_bytes())?;

        Ok(())
    }

    /// Roll the workspace back to the latest snapshot
    ///
    /// When the agent has no snapshot yet, one is first taken from its
    /// current workspace so the operation always has a recovery point.
    async fn restore(&self, agent: &AgentDescriptor) -> Result<()> {
        let progress_log = self.channel.progress_log(&agent.id);

        let snapshot = match self.snapshots.latest_for(&agent.id)? {
            Some(snapshot) => {
                info!("Restoring {} from {}", agent.id, snapshot.dir_name);
                snapshot
            }
            None => {
                warn!(
                    "No snapshot for {}; capturing current workspace first",
                    agent.id
                );
                self.snapshots.create(agent, Some(&progress_log), None)?
            }
        };

        self.containers.stop(&agent.id).await?;

        if agent.workspace.exists() {
            std::fs::remove_dir_all(&agent.workspace)?;
        }
        if snapshot.workspace().exists() {
            copy_dir_all(&snapshot.workspace(), &agent.workspace)?;
        } else {
            warn!(
                "Snapshot {} has no workspace copy; starting {} with an empty workspace",
                snapshot.dir_name, agent.id
            );
            std::fs::create_dir_all(&agent.workspace)?;
        }

        if snapshot.progress_log().exists() {
            if let Some(parent) = progress_log.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(snapshot.progress_log(), &progress_log)?;
        }

        self.containers.start(&agent.id).await?;
        Ok(())
    }

    /// Tear the container down and rebuild its image
    ///
    /// The backup snapshot must exist before the first destructive step.
    async fn rebuild(&self, agent: &AgentDescriptor) -> Result<()> {
        let progress_log = self.channel.progress_log(&agent.id);
        let backup = self
            .snapshots
            .create(agent, Some(&progress_log), Some("backup"))?;
        info!("Backup {} taken before rebuild of {}", backup.dir_name, agent.id);

        self.containers.stop(&agent.id).await?;
        self.containers.remove(&agent.id).await?;
        self.containers.build(&agent.id).await?;
        self.containers.up(&agent.id).await?;
        Ok(())
    }

    /// Report container status and the progress log tail
    async fn report(&self, agent: &AgentDescriptor) {
        let status = match self.containers.status(&agent.id).await {
            Ok(status) => status,
            Err(e) => {
                warn!("Could not query container status: {}", e);
                "unknown".to_string()
            }
        };
        info!("Agent {} container: {}", agent.id, status);

        match self.channel.progress_tail(&agent.id, 5) {
            Some(tail) => {
                info!("Recent progress for {}:", agent.id);
                for line in tail.lines() {
                    info!("  {}", line);
                }
            }
            None => info!("No progress file found for {}", agent.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use convoy_core::AgentRole;
    use convoy_container::{ContainerOutput, MockContainerExecutor};
    use std::path::Path;

    fn setup(dir: &Path) -> (AgentDescriptor, CommunicationChannel) {
        let workspace = dir.join("workspaces/crypto");
        std::fs::create_dir_all(workspace.join("src")).unwrap();
        std::fs::write(workspace.join("src/keys.ts"), "original").unwrap();

        let agent = AgentDescriptor::new("crypto", AgentRole::Security, &workspace, "crypto", 1);
        let channel = CommunicationChannel::new(dir.join("comms"));
        channel.ensure_channels(std::slice::from_ref(&agent)).unwrap();
        (agent, channel)
    }

    fn manager(
        executor: MockContainerExecutor,
        channel: &CommunicationChannel,
    ) -> RecoveryManager<MockContainerExecutor> {
        RecoveryManager::new(ContainerManager::new(executor, "convoy-"), channel.clone())
    }

    #[tokio::test]
    async fn test_restart_bounces_container_and_logs() {
        let dir = tempfile::tempdir().unwrap();
        let (agent, channel) = setup(dir.path());
        let executor = MockContainerExecutor::new();
        let recovery = manager(executor.clone(), &channel);

        recovery.recover(&agent, RecoveryMode::Restart).await.unwrap();

        assert!(executor.calls()[0].starts_with("restart convoy-crypto"));
        let log = std::fs::read_to_string(channel.progress_log("crypto")).unwrap();
        assert!(log.contains("container restarted by recovery"));
    }

    #[tokio::test]
    async fn test_restart_failure_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let (agent, channel) = setup(dir.path());
        let executor = MockContainerExecutor::new()
            .with_response("restart convoy-crypto", ContainerOutput::failed("gone"));
        let recovery = manager(executor, &channel);

        let err = recovery.recover(&agent, RecoveryMode::Restart).await.unwrap_err();
        assert!(err.to_string().contains("gone"));
        // No progress line was appended for the failed restart.
        assert!(!channel.progress_log("crypto").exists());
    }

    #[tokio::test]
    async fn test_restore_uses_latest_snapshot_and_orders_calls() {
        let dir = tempfile::tempdir().unwrap();
        let (agent, channel) = setup(dir.path());

        // Two snapshots; the newer one must win.
        let snapshots = channel.snapshots_root();
        for (name, content) in [
            ("crypto-20250101-000000", "old"),
            ("crypto-20250102-000000", "new"),
        ] {
            let workspace = snapshots.join(name).join("workspace/src");
            std::fs::create_dir_all(&workspace).unwrap();
            std::fs::write(workspace.join("keys.ts"), content).unwrap();
        }

        // Agent has since diverged.
        std::fs::write(agent.workspace.join("src/keys.ts"), "broken").unwrap();

        let executor = MockContainerExecutor::new();
        let recovery = manager(executor.clone(), &channel);
        recovery.recover(&agent, RecoveryMode::Restore).await.unwrap();

        let restored = std::fs::read_to_string(agent.workspace.join("src/keys.ts")).unwrap();
        assert_eq!(restored, "new");

        // Stop strictly precedes start; the workspace swap happens between.
        let calls = executor.calls();
        let stop = calls.iter().position(|c| c == "stop convoy-crypto").unwrap();
        let start = calls.iter().position(|c| c == "start convoy-crypto").unwrap();
        assert!(stop < start);
    }

    #[tokio::test]
    async fn test_restore_bootstraps_snapshot_when_none() {
        let dir = tempfile::tempdir().unwrap();
        let (agent, channel) = setup(dir.path());

        let executor = MockContainerExecutor::new();
        let recovery = manager(executor, &channel);
        recovery.recover(&agent, RecoveryMode::Restore).await.unwrap();

        // A snapshot now exists and the workspace survived the round trip.
        let store = SnapshotStore::new(channel.snapshots_root());
        assert!(store.latest_for("crypto").unwrap().is_some());
        assert!(agent.workspace.join("src/keys.ts").exists());
    }

    #[tokio::test]
    async fn test_rebuild_backs_up_before_destroying() {
        let dir = tempfile::tempdir().unwrap();
        let (agent, channel) = setup(dir.path());

        let executor = MockContainerExecutor::new();
        let recovery = manager(executor.clone(), &channel);
        recovery.recover(&agent, RecoveryMode::Rebuild).await.unwrap();

        // The backup exists and carries the workspace copy.
        let store = SnapshotStore::new(channel.snapshots_root());
        let backup = store.latest_for("crypto").unwrap().unwrap();
        assert!(backup.dir_name.ends_with("-backup"));
        assert!(backup.workspace().join("src/keys.ts").exists());

        // No container command ran before the snapshot copy: the first
        // recorded call is the stop that follows backup creation.
        let calls = executor.calls();
        assert_eq!(calls[0], "stop convoy-crypto");
        assert_eq!(calls[1], "rm convoy-crypto");
        assert_eq!(calls[2], "compose build crypto");
        assert_eq!(calls[3], "compose up -d crypto");
    }

    #[tokio::test]
    async fn test_rebuild_stop_failure_propagates_after_backup() {
        let dir = tempfile::tempdir().unwrap();
        let (agent, channel) = setup(dir.path());

        let executor = MockContainerExecutor::new()
            .with_response("stop convoy-crypto", ContainerOutput::failed("daemon down"));
        let recovery = manager(executor.clone(), &channel);

        let err = recovery.recover(&agent, RecoveryMode::Rebuild).await.unwrap_err();
        assert!(err.to_string().contains("daemon down"));

        // The backup was still taken before the failure.
        let store = SnapshotStore::new(channel.snapshots_root());
        assert!(store.latest_for("crypto").unwrap().is_some());
        // And nothing destructive ran after the failed stop.
        assert_eq!(executor.calls(), vec!["stop convoy-crypto"]);
    }
}
