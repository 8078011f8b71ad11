//! Rule store error types

use std::path::PathBuf;
use thiserror::Error;

use trackwall_gateway::GatewayError;

#[derive(Error, Debug)]
pub enum RuleError {
    #[error("Could not acquire privileged file access for {path}: {source}")]
    PrivilegedAccess {
        path: PathBuf,
        #[source]
        source: GatewayError,
    },

    #[error("Malformed rules file: {0}")]
    Parse(String),

    #[error("Failed to read rules file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: GatewayError,
    },

    #[error("Failed to write rules file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: GatewayError,
    },

    #[error("Failed to serialize rules: {0}")]
    Serialize(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

impl RuleError {
    /// Open/exists failures; permission problems here mean no privileged access at all
    pub(crate) fn acquire(path: PathBuf, source: GatewayError) -> Self {
        if source.is_permission_denied() {
            RuleError::PrivilegedAccess { path, source }
        } else {
            RuleError::Read { path, source }
        }
    }
}
