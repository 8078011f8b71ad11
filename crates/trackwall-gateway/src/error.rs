//! Gateway error types

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    #[error("File not found: {0}")]
    NotFound(PathBuf),

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl GatewayError {
    pub fn from_io(path: &Path, source: std::io::Error) -> Self {
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => GatewayError::PermissionDenied(path.to_path_buf()),
            std::io::ErrorKind::NotFound => GatewayError::NotFound(path.to_path_buf()),
            _ => GatewayError::Io {
                path: path.to_path_buf(),
                source,
            },
        }
    }

    pub fn is_permission_denied(&self) -> bool {
        matches!(self, GatewayError::PermissionDenied(_))
    }
}
