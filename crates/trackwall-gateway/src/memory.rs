//! In-memory gateway
//!
//! Files live in a shared map; handles write straight through to it, so a
//! failure between truncate and write is observable the same way it would be
//! on disk.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::GatewayError;
use crate::gateway::{GatewayHandle, PrivilegedGateway};
use crate::Result;

#[derive(Debug, Default)]
struct MemoryState {
    files: HashMap<PathBuf, Vec<u8>>,
    /// Completed `write` calls
    writes: usize,
    denied: bool,
    read_only: bool,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryGateway {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every operation fails with `PermissionDenied`
    pub fn set_denied(&self, denied: bool) {
        self.state.lock().denied = denied;
    }

    /// Reads succeed, `write` and `truncate` fail with `PermissionDenied`
    pub fn set_read_only(&self, read_only: bool) {
        self.state.lock().read_only = read_only;
    }

    pub fn insert(&self, path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) {
        self.state.lock().files.insert(path.into(), contents.into());
    }

    pub fn contents(&self, path: &Path) -> Option<Vec<u8>> {
        self.state.lock().files.get(path).cloned()
    }

    pub fn write_count(&self) -> usize {
        self.state.lock().writes
    }

    fn check_access(&self, path: &Path) -> Result<()> {
        if self.state.lock().denied {
            return Err(GatewayError::PermissionDenied(path.to_path_buf()));
        }
        Ok(())
    }
}

impl PrivilegedGateway for MemoryGateway {
    fn exists(&self, path: &Path) -> Result<bool> {
        self.check_access(path)?;
        Ok(self.state.lock().files.contains_key(path))
    }

    fn read_all(&self, path: &Path) -> Result<Vec<u8>> {
        self.check_access(path)?;
        self.contents(path)
            .ok_or_else(|| GatewayError::NotFound(path.to_path_buf()))
    }

    fn open_read_write(&self, path: &Path) -> Result<Box<dyn GatewayHandle>> {
        self.check_access(path)?;
        {
            let mut state = self.state.lock();
            if !state.files.contains_key(path) {
                if state.read_only {
                    return Err(GatewayError::PermissionDenied(path.to_path_buf()));
                }
                state.files.insert(path.to_path_buf(), Vec::new());
            }
        }

        Ok(Box::new(MemoryHandle {
            state: Arc::clone(&self.state),
            path: path.to_path_buf(),
            cursor: 0,
        }))
    }
}

struct MemoryHandle {
    state: Arc<Mutex<MemoryState>>,
    path: PathBuf,
    cursor: usize,
}

impl MemoryHandle {
    fn writable(&self, state: &MemoryState) -> Result<()> {
        if state.denied || state.read_only {
            return Err(GatewayError::PermissionDenied(self.path.clone()));
        }
        Ok(())
    }
}

impl GatewayHandle for MemoryHandle {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let state = self.state.lock();
        if state.denied {
            return Err(GatewayError::PermissionDenied(self.path.clone()));
        }
        let data = state
            .files
            .get(&self.path)
            .ok_or_else(|| GatewayError::NotFound(self.path.clone()))?;

        // Another handle may have shrunk the file under this cursor
        let start = self.cursor.min(data.len());
        let n = (data.len() - start).min(buf.len());
        buf[..n].copy_from_slice(&data[start..start + n]);
        drop(state);

        self.cursor = start + n;
        Ok(n)
    }

    fn truncate(&mut self, len: u64) -> Result<()> {
        let mut state = self.state.lock();
        self.writable(&state)?;
        let file = state.files.entry(self.path.clone()).or_default();
        file.truncate(len as usize);
        drop(state);

        self.cursor = 0;
        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let mut state = self.state.lock();
        self.writable(&state)?;
        let file = state.files.entry(self.path.clone()).or_default();

        let end = self.cursor + bytes.len();
        if file.len() < end {
            file.resize(end, 0);
        }
        file[self.cursor..end].copy_from_slice(bytes);
        state.writes += 1;
        drop(state);

        self.cursor = end;
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_through() {
        let gateway = MemoryGateway::new();
        let path = Path::new("/data/system/ifw/a.xml");

        assert!(!gateway.exists(path).unwrap());

        let mut handle = gateway.open_read_write(path).unwrap();
        handle.write(b"abcdef").unwrap();
        handle.truncate(0).unwrap();
        handle.write(b"xy").unwrap();
        handle.close().unwrap();

        assert_eq!(gateway.contents(path).unwrap(), b"xy");
        assert_eq!(gateway.write_count(), 2);
    }

    #[test]
    fn test_denied() {
        let gateway = MemoryGateway::new();
        gateway.insert("/r.xml", "<rules/>");
        gateway.set_denied(true);

        assert!(gateway.exists(Path::new("/r.xml")).unwrap_err().is_permission_denied());
        assert!(gateway.open_read_write(Path::new("/r.xml")).is_err());
    }

    #[test]
    fn test_read_only_handle() {
        let gateway = MemoryGateway::new();
        gateway.insert("/r.xml", "<rules/>");
        gateway.set_read_only(true);

        let mut handle = gateway.open_read_write(Path::new("/r.xml")).unwrap();
        assert_eq!(handle.read_to_end().unwrap(), b"<rules/>");
        assert!(handle.truncate(0).unwrap_err().is_permission_denied());
        assert_eq!(gateway.contents(Path::new("/r.xml")).unwrap(), b"<rules/>");
    }

    #[test]
    fn test_read_after_other_handle_shrinks_file() {
        let gateway = MemoryGateway::new();
        let path = Path::new("/r.xml");
        gateway.insert(path, "0123456789");

        let mut reader = gateway.open_read_write(path).unwrap();
        assert_eq!(reader.read_to_end().unwrap().len(), 10);

        let mut writer = gateway.open_read_write(path).unwrap();
        writer.truncate(0).unwrap();
        writer.write(b"ab").unwrap();

        assert!(reader.read_to_end().unwrap().is_empty());
        assert_eq!(gateway.contents(path).unwrap(), b"ab");
    }
}
