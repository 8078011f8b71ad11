//! Service configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::CoreError;
use crate::Result;

const DEFAULT_RULES_DIR: &str = "/data/system/ifw";
const DEFAULT_MANIFESTS_DIR: &str = "/data/local/tmp/trackwall/manifests";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding one `<package>.xml` rule file per package
    pub rules_dir: PathBuf,
    /// Rule files are only read or written when set
    pub use_privileged_access: bool,
    /// JSON signature file; the built-in table is used when absent
    pub signatures_path: Option<PathBuf>,
    /// `<manifests_dir>/<package>/AndroidManifest.xml` for installed packages
    pub manifests_dir: PathBuf,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| CoreError::Config(format!("{}: {}", path.display(), e)))?;
        let config: Config = serde_json::from_str(&json)?;

        if config.rules_dir.as_os_str().is_empty() {
            return Err(CoreError::Config("rules_dir must not be empty".to_string()));
        }

        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rules_dir: PathBuf::from(DEFAULT_RULES_DIR),
            use_privileged_access: false,
            signatures_path: None,
            manifests_dir: PathBuf::from(DEFAULT_MANIFESTS_DIR),
        }
    }
}
