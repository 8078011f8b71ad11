//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Signature error: {0}")]
    Signature(#[from] trackwall_signatures::SignatureError),

    #[error("Component error: {0}")]
    Component(#[from] trackwall_components::ComponentError),

    #[error("Rule error: {0}")]
    Rule(#[from] trackwall_rules::RuleError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not acquire privileged file access: privileged access is not enabled")]
    PrivilegedAccessUnavailable,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Background task failed: {0}")]
    Task(String),
}
