//! Trackwall Signature Database
//!
//! Known tracker identities keyed by code pattern:
//! - Loaded once (built-in table or JSON file)
//! - Read-only after load
//! - Longest matching pattern wins on overlap

mod builtin;
mod database;
mod error;
mod signature;

pub use database::{PatternOverlap, SignatureDatabase};
pub use error::SignatureError;
pub use signature::TrackerSignature;

pub type Result<T> = std::result::Result<T, SignatureError>;
