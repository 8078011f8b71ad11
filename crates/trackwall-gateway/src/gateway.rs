//! Gateway contract

use std::path::Path;

use crate::Result;

pub trait PrivilegedGateway: Send + Sync {
    fn exists(&self, path: &Path) -> Result<bool>;

    fn read_all(&self, path: &Path) -> Result<Vec<u8>>;

    /// Open for reading and writing, creating the file when missing
    fn open_read_write(&self, path: &Path) -> Result<Box<dyn GatewayHandle>>;
}

pub trait GatewayHandle: Send {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Resize to `len` bytes and move the cursor to the start
    fn truncate(&mut self, len: u64) -> Result<()>;

    fn write(&mut self, bytes: &[u8]) -> Result<()>;

    fn close(self: Box<Self>) -> Result<()>;

    fn read_to_end(&mut self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut buf = [0u8; 8192];
        loop {
            let n = self.read(&mut buf)?;
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }
        Ok(out)
    }
}
