//! Workspace snapshots
//!
//! A snapshot is a timestamp-named directory under `snapshots/` holding a
//! copy of an agent's workspace and, when present, its progress log.
//! Names follow `<agentId>-<YYYYMMDD-HHMMSS>[-suffix]`. Selection parses
//! the embedded timestamp rather than trusting raw string order, with the
//! directory name as tie-break so suffix variants stay totally ordered.
//! Snapshots are immutable once written.

use chrono::{NaiveDateTime, Timelike};
use convoy_core::{AgentDescriptor, ConvoyError, Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Timestamp layout embedded in snapshot directory names
pub const TIMESTAMP_FMT: &str = "%Y%m%d-%H%M%S";

/// A parsed snapshot directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub agent_id: String,
    pub timestamp: NaiveDateTime,
    pub dir_name: String,
    pub path: PathBuf,
}

impl Snapshot {
    /// Workspace copy inside the snapshot
    pub fn workspace(&self) -> PathBuf {
        self.path.join("workspace")
    }

    /// Progress log copy inside the snapshot, if one was taken
    pub fn progress_log(&self) -> PathBuf {
        self.path.join("progress.md")
    }
}

/// Parse `<agentId>-<YYYYMMDD-HHMMSS>[-suffix]` for a specific agent
///
/// Returns `None` for names that belong to other agents or do not carry a
/// well-formed timestamp.
fn parse_name(agent_id: &str, name: &str) -> Option<NaiveDateTime> {
    let rest = name.strip_prefix(agent_id)?.strip_prefix('-')?;
    // Timestamp is exactly "YYYYMMDD-HHMMSS"; anything after is a suffix.
    if rest.len() < 15 {
        return None;
    }
    let (stamp, tail) = rest.split_at(15);
    if !tail.is_empty() && !tail.starts_with('-') {
        return None;
    }
    NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FMT).ok()
}

/// Store of snapshots for the whole fleet, rooted at `snapshots/`
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    root: PathBuf,
}

impl SnapshotStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Most recent snapshot for an agent, or `None` if it has none
    ///
    /// Ordered by parsed timestamp, then directory name, so the result is
    /// a total order even across suffix variants created in the same
    /// second.
    pub fn latest_for(&self, agent_id: &str) -> Result<Option<Snapshot>> {
        if !self.root.exists() {
            return Ok(None);
        }

        let mut best: Option<Snapshot> = None;
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            let Some(timestamp) = parse_name(agent_id, &name) else {
                continue;
            };

            let candidate = Snapshot {
                agent_id: agent_id.to_string(),
                timestamp,
                dir_name: name,
                path: entry.path(),
            };

            let newer = match &best {
                None => true,
                Some(current) => {
                    (candidate.timestamp, &candidate.dir_name)
                        > (current.timestamp, &current.dir_name)
                }
            };
            if newer {
                best = Some(candidate);
            }
        }

        Ok(best)
    }

    /// Create a snapshot of an agent's workspace and progress log
    ///
    /// Best-effort: a missing workspace or progress log is tolerated with
    /// a warning and does not abort the copy. The snapshot directory
    /// itself always comes into existence, which is what the
    /// backup-before-destroy invariant rests on.
    pub fn create(
        &self,
        agent: &AgentDescriptor,
        progress_log: Option<&Path>,
        suffix: Option<&str>,
    ) -> Result<Snapshot> {
        // Second precision, matching what the name can represent.
        let now = chrono::Local::now().naive_local();
        let now = now.with_nanosecond(0).unwrap_or(now);
        let mut dir_name = format!("{}-{}", agent.id, now.format(TIMESTAMP_FMT));
        if let Some(suffix) = suffix {
            dir_name.push('-');
            dir_name.push_str(suffix);
        }

        let path = self.root.join(&dir_name);
        if path.exists() {
            return Err(ConvoyError::Snapshot(format!(
                "snapshot {} already exists",
                dir_name
            )));
        }
        std::fs::create_dir_all(&path)?;

        if agent.workspace.exists() {
            copy_dir_all(&agent.workspace, &path.join("workspace"))?;
        } else {
            warn!(
                "Workspace {:?} missing; snapshot {} has no workspace copy",
                agent.workspace, dir_name
            );
        }

        if let Some(log) = progress_log {
            if log.exists() {
                std::fs::copy(log, path.join("progress.md"))?;
            } else {
                warn!("No progress log at {:?}; not captured in {}", log, dir_name);
            }
        }

        info!("Created snapshot {}", dir_name);
        Ok(Snapshot {
            agent_id: agent.id.clone(),
            timestamp: now,
            dir_name,
            path,
        })
    }
}

/// Recursively copy a directory tree
pub fn copy_dir_all(src: &Path, dst: &Path) -> Result<()> {
    std::fs::create_dir_all(dst)?;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let target = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_all(&entry.path(), &target)?;
        } else {
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use convoy_core::AgentRole;

    fn agent(workspace: &Path) -> AgentDescriptor {
        AgentDescriptor::new("crypto", AgentRole::Security, workspace, "crypto", 1)
    }

    #[test]
    fn test_parse_name_variants() {
        assert!(parse_name("a", "a-20250101-000000").is_some());
        assert!(parse_name("a", "a-20250101-000000-backup").is_some());
        assert!(parse_name("a", "b-20250101-000000").is_none());
        assert!(parse_name("a", "a-garbage").is_none());
        assert!(parse_name("a", "a-20250101").is_none());
    }

    #[test]
    fn test_latest_selection_is_total_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        for name in [
            "a-20250101-000000",
            "a-20250102-000000",
            "a-20250101-120000-backup",
            "b-20250301-000000",
        ] {
            std::fs::create_dir_all(dir.path().join(name)).unwrap();
        }

        let latest = store.latest_for("a").unwrap().unwrap();
        assert_eq!(latest.dir_name, "a-20250102-000000");

        let latest_b = store.latest_for("b").unwrap().unwrap();
        assert_eq!(latest_b.dir_name, "b-20250301-000000");
    }

    #[test]
    fn test_latest_none_when_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("snapshots"));
        assert!(store.latest_for("a").unwrap().is_none());
    }

    #[test]
    fn test_create_copies_workspace_and_log() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = dir.path().join("workspace");
        std::fs::create_dir_all(workspace.join("src")).unwrap();
        std::fs::write(workspace.join("src/keys.ts"), "key material").unwrap();
        let log = dir.path().join("progress.md");
        std::fs::write(&log, "did things\n").unwrap();

        let store = SnapshotStore::new(dir.path().join("snapshots"));
        std::fs::create_dir_all(store.root()).unwrap();

        let snapshot = store.create(&agent(&workspace), Some(&log), None).unwrap();
        assert!(snapshot.workspace().join("src/keys.ts").exists());
        assert!(snapshot.progress_log().exists());

        // And it is now selectable as the latest.
        let latest = store.latest_for("crypto").unwrap().unwrap();
        assert_eq!(latest.dir_name, snapshot.dir_name);
    }

    #[test]
    fn test_create_tolerates_missing_pieces() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("snapshots"));
        std::fs::create_dir_all(store.root()).unwrap();

        let missing_workspace = dir.path().join("nope");
        let missing_log = dir.path().join("no-progress.md");
        let snapshot = store
            .create(&agent(&missing_workspace), Some(&missing_log), Some("backup"))
            .unwrap();

        assert!(snapshot.path.exists());
        assert!(!snapshot.workspace().exists());
        assert!(!snapshot.progress_log().exists());
        assert!(snapshot.dir_name.ends_with("-backup"));
    }
}
