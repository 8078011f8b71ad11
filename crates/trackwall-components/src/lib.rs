//! Trackwall Component Enumeration
//!
//! Declared activities, services, receivers and providers of a package,
//! read from the installed package or, failing that, from its archive.

mod component;
mod enumerator;
mod error;
mod manifest;

pub use component::{Component, ComponentKind, PackageComponents, PackageIdentity};
pub use enumerator::{
    ArchiveSource, ComponentEnumerator, EnumerateComponents, InstalledManifests, InstalledSource,
    ManifestArchive,
};
pub use error::ComponentError;
pub use manifest::parse_manifest;

pub type Result<T> = std::result::Result<T, ComponentError>;
