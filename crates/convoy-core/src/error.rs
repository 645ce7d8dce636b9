//! Unified error types for Convoy

use thiserror::Error;

/// Unified error type for all Convoy operations
#[derive(Error, Debug)]
pub enum ConvoyError {
    // Container runtime errors
    #[error("Container command failed: {0}")]
    Container(String),

    #[error("Container not found: {0}")]
    ContainerNotFound(String),

    // Communication channel errors
    #[error("Communication channel error: {0}")]
    Channel(String),

    // Launch errors
    #[error("Launch error: {0}")]
    Launch(String),

    // Agent errors
    #[error("Agent not found: {0}")]
    AgentNotFound(String),

    // Verification errors
    #[error("Verification error: {0}")]
    Verification(String),

    // Recovery errors
    #[error("Recovery error: {0}")]
    Recovery(String),

    #[error("Snapshot error: {0}")]
    Snapshot(String),

    // Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(String),
}

/// Result type alias using ConvoyError
pub type Result<T> = std::result::Result<T, ConvoyError>;
