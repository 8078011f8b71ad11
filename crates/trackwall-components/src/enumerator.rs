//! Component enumeration
//!
//! Installed package first, archive second. Failure of both is a
//! `PackageResolution` error carrying every reason collected on the way.

use std::path::{Path, PathBuf};

use crate::component::{PackageComponents, PackageIdentity};
use crate::error::ComponentError;
use crate::manifest::parse_manifest;
use crate::Result;

const MANIFEST_FILE: &str = "AndroidManifest.xml";

/// Live package registry
pub trait InstalledSource: Send + Sync {
    fn is_installed(&self, package_name: &str) -> bool;
    fn installed_components(&self, package_name: &str) -> Result<PackageComponents>;
}

/// On-disk package archive reader
pub trait ArchiveSource: Send + Sync {
    fn archive_components(&self, archive: &Path) -> Result<PackageComponents>;
}

pub trait EnumerateComponents: Send + Sync {
    fn enumerate(&self, package: &PackageIdentity) -> Result<PackageComponents>;
}

pub struct ComponentEnumerator<I, A> {
    installed: I,
    archive: A,
}

impl<I, A> ComponentEnumerator<I, A>
where
    I: InstalledSource,
    A: ArchiveSource,
{
    pub fn new(installed: I, archive: A) -> Self {
        Self { installed, archive }
    }
}

impl<I, A> EnumerateComponents for ComponentEnumerator<I, A>
where
    I: InstalledSource,
    A: ArchiveSource,
{
    fn enumerate(&self, package: &PackageIdentity) -> Result<PackageComponents> {
        let name = package.package_name.as_str();
        let mut reasons = Vec::new();

        if self.installed.is_installed(name) {
            match self.installed.installed_components(name) {
                Ok(components) => {
                    tracing::debug!(
                        package = %name,
                        components = components.len(),
                        "Enumerated installed package"
                    );
                    return Ok(components);
                }
                Err(e) => {
                    tracing::warn!(package = %name, error = %e, "Installed package unreadable, trying archive");
                    reasons.push(format!("installed package: {}", e));
                }
            }
        } else {
            reasons.push("package is not installed".to_string());
        }

        match &package.archive_path {
            Some(path) => match self.archive.archive_components(path) {
                Ok(components) => {
                    if components.package_name != name {
                        tracing::warn!(
                            package = %name,
                            archive_package = %components.package_name,
                            "Archive declares a different package name"
                        );
                    }
                    tracing::debug!(
                        package = %name,
                        archive = %path.display(),
                        components = components.len(),
                        "Enumerated package archive"
                    );
                    return Ok(components);
                }
                Err(e) => reasons.push(format!("archive {}: {}", path.display(), e)),
            },
            None => reasons.push("no archive path".to_string()),
        }

        Err(ComponentError::PackageResolution {
            package: name.to_string(),
            reason: reasons.join("; "),
        })
    }
}

/// Installed packages as `<root>/<package>/AndroidManifest.xml`
#[derive(Debug, Clone)]
pub struct InstalledManifests {
    root: PathBuf,
}

impl InstalledManifests {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn manifest_path(&self, package_name: &str) -> Option<PathBuf> {
        let valid = !package_name.is_empty()
            && package_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_')
            && !package_name.contains("..");
        valid.then(|| self.root.join(package_name).join(MANIFEST_FILE))
    }
}

impl InstalledSource for InstalledManifests {
    fn is_installed(&self, package_name: &str) -> bool {
        self.manifest_path(package_name)
            .map(|path| path.is_file())
            .unwrap_or(false)
    }

    fn installed_components(&self, package_name: &str) -> Result<PackageComponents> {
        let path = self
            .manifest_path(package_name)
            .ok_or_else(|| ComponentError::Manifest(format!("invalid package name: {}", package_name)))?;
        let xml = std::fs::read_to_string(path)?;
        parse_manifest(&xml)
    }
}

/// Decoded archive: either the manifest file itself or a directory holding one
#[derive(Debug, Clone, Copy, Default)]
pub struct ManifestArchive;

impl ArchiveSource for ManifestArchive {
    fn archive_components(&self, archive: &Path) -> Result<PackageComponents> {
        let path = if archive.is_dir() {
            archive.join(MANIFEST_FILE)
        } else {
            archive.to_path_buf()
        };
        let xml = std::fs::read_to_string(path)?;
        parse_manifest(&xml)
    }
}
