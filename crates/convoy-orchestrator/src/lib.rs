//! Fleet orchestration engine for Convoy
//!
//! One orchestration run flows: registry → channel init → prompt
//! generation → parallel launch → progress monitoring → verification &
//! integration. Recovery is an out-of-band single-agent operation that
//! shares only the snapshot, workspace, and channel conventions.

pub mod channel;
pub mod launcher;
pub mod monitor;
pub mod orchestrator;
pub mod prompt;
pub mod recovery;
pub mod registry;
pub mod snapshot;
pub mod verify;

pub use channel::CommunicationChannel;
pub use launcher::launch_all;
pub use monitor::{MonitorConfig, MonitorOutcome, ProgressMonitor};
pub use orchestrator::{FleetOrchestrator, RunReport};
pub use recovery::RecoveryManager;
pub use registry::AgentRegistry;
pub use snapshot::{Snapshot, SnapshotStore};
pub use verify::Verifier;
