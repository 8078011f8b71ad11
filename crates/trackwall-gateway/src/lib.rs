//! Trackwall Privileged I/O Gateway
//!
//! Elevated file access used by the rule store. Open, read, truncate and
//! write are separate calls; the gateway does not make them atomic.

mod error;
mod gateway;
mod local;
mod memory;

pub use error::GatewayError;
pub use gateway::{GatewayHandle, PrivilegedGateway};
pub use local::LocalGateway;
pub use memory::MemoryGateway;

pub type Result<T> = std::result::Result<T, GatewayError>;
