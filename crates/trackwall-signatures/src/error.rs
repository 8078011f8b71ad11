//! Signature error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SignatureError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid signature data: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Signature has no name")]
    MissingName,

    #[error("Signature {0} has no code patterns")]
    NoPatterns(String),
}
