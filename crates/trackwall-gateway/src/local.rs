//! Direct filesystem gateway
//!
//! Privilege comes from the hosting process (root shell, su wrapper).

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::GatewayError;
use crate::gateway::{GatewayHandle, PrivilegedGateway};
use crate::Result;

#[derive(Debug, Clone, Copy, Default)]
pub struct LocalGateway;

impl LocalGateway {
    pub fn new() -> Self {
        Self
    }
}

impl PrivilegedGateway for LocalGateway {
    fn exists(&self, path: &Path) -> Result<bool> {
        match std::fs::metadata(path) {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(GatewayError::from_io(path, e)),
        }
    }

    fn read_all(&self, path: &Path) -> Result<Vec<u8>> {
        std::fs::read(path).map_err(|e| GatewayError::from_io(path, e))
    }

    fn open_read_write(&self, path: &Path) -> Result<Box<dyn GatewayHandle>> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| GatewayError::from_io(parent, e))?;
            }
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| GatewayError::from_io(path, e))?;

        tracing::debug!(path = %path.display(), "Opened privileged file");

        Ok(Box::new(LocalHandle {
            file,
            path: path.to_path_buf(),
        }))
    }
}

struct LocalHandle {
    file: File,
    path: PathBuf,
}

impl LocalHandle {
    fn io_err(&self, e: std::io::Error) -> GatewayError {
        GatewayError::from_io(&self.path, e)
    }
}

impl GatewayHandle for LocalHandle {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.file.read(buf).map_err(|e| self.io_err(e))
    }

    fn truncate(&mut self, len: u64) -> Result<()> {
        self.file.set_len(len).map_err(|e| self.io_err(e))?;
        self.file
            .seek(SeekFrom::Start(0))
            .map_err(|e| self.io_err(e))?;
        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.file.write_all(bytes).map_err(|e| self.io_err(e))
    }

    fn close(mut self: Box<Self>) -> Result<()> {
        self.file.flush().map_err(|e| self.io_err(e))?;
        self.file.sync_all().map_err(|e| self.io_err(e))
    }
}
