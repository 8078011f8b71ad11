//! Component error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ComponentError {
    #[error("Could not resolve components for package {package}: {reason}")]
    PackageResolution { package: String, reason: String },

    #[error("Invalid manifest: {0}")]
    Manifest(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
