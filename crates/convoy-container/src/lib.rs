//! # convoy-container
//!
//! Container runtime layer for Convoy orchestration.
//!
//! This crate provides:
//! - Container command execution abstraction (docker CLI)
//! - The per-agent container operations recovery relies on
//! - A recording mock executor for tests

mod command;
mod manager;

pub use command::{ContainerExecutor, ContainerOutput, DockerCli, MockContainerExecutor};
pub use manager::ContainerManager;
