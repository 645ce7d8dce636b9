//! # convoy-core
//!
//! Core types for the Convoy fleet orchestrator.
//!
//! Convoy manages a fixed roster of named agents, each bound to a container
//! and a persistent workspace volume. All coordination between the
//! orchestrator and its agents happens through a shared-filesystem
//! communication channel; there is no RPC.
//!
//! ## Core paradigm
//!
//! - Agents are statically enumerated; the roster never changes mid-run
//! - Status files are owned by agents, only observed by the orchestrator
//! - Absence of a status file means "waiting"
//! - Recovery points ARE timestamped workspace snapshots

mod config;
mod error;
mod types;

pub use config::{ConvoyConfig, EXTERNAL_AGENTS_ENV};
pub use error::{ConvoyError, Result};
pub use types::*;
