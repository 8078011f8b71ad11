//! Trackwall Core
//!
//! Coordination layer: configuration, the background tracker service and
//! the single-slot channels it publishes on.

mod config;
mod error;
mod service;

pub use config::Config;
pub use error::CoreError;
pub use service::{ActionOutcome, ScanReport, TrackerService, TrackerUpdate, Warning};

// Re-export component crates
pub use trackwall_components::{
    Component, ComponentEnumerator, ComponentError, ComponentKind, EnumerateComponents,
    InstalledManifests, ManifestArchive, PackageComponents, PackageIdentity,
};
pub use trackwall_gateway::{GatewayError, LocalGateway, MemoryGateway, PrivilegedGateway};
pub use trackwall_matcher::{match_trackers, MatchReport, Tracker, TrackerMatcher};
pub use trackwall_rules::{FirewallDocument, RuleError, RuleSet, RuleStore, RuleTag, UnblockOutcome};
pub use trackwall_signatures::{PatternOverlap, SignatureDatabase, SignatureError, TrackerSignature};

pub type Result<T> = std::result::Result<T, CoreError>;

/// Initialize logging
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}
