//! Component data structures

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    Activity,
    Service,
    Receiver,
    Provider,
}

impl ComponentKind {
    pub const ALL: [ComponentKind; 4] = [
        ComponentKind::Activity,
        ComponentKind::Service,
        ComponentKind::Receiver,
        ComponentKind::Provider,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentKind::Activity => "activity",
            ComponentKind::Service => "service",
            ComponentKind::Receiver => "receiver",
            ComponentKind::Provider => "provider",
        }
    }
}

impl std::fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ComponentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "activity" => Ok(ComponentKind::Activity),
            "service" => Ok(ComponentKind::Service),
            "receiver" => Ok(ComponentKind::Receiver),
            "provider" => Ok(ComponentKind::Provider),
            _ => Err(format!("Unknown component kind: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    pub kind: ComponentKind,
    /// Fully-qualified class name
    pub name: String,
    pub exported: bool,
    pub enabled: bool,
}

impl Component {
    pub fn new(kind: ComponentKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            exported: false,
            enabled: true,
        }
    }
}

/// Package to enumerate, plus the archive to fall back on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageIdentity {
    pub package_name: String,
    pub archive_path: Option<PathBuf>,
}

impl PackageIdentity {
    pub fn new(package_name: impl Into<String>) -> Self {
        Self {
            package_name: package_name.into(),
            archive_path: None,
        }
    }

    pub fn with_archive(mut self, path: impl Into<PathBuf>) -> Self {
        self.archive_path = Some(path.into());
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackageComponents {
    pub package_name: String,
    pub components: Vec<Component>,
}

impl PackageComponents {
    pub fn of_kind(&self, kind: ComponentKind) -> impl Iterator<Item = &Component> {
        self.components.iter().filter(move |c| c.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trip() {
        for kind in ComponentKind::ALL {
            assert_eq!(kind.as_str().parse::<ComponentKind>().unwrap(), kind);
        }
        assert_eq!("Receiver".parse::<ComponentKind>().unwrap(), ComponentKind::Receiver);
        assert!("activity-alias".parse::<ComponentKind>().is_err());
    }

    #[test]
    fn test_of_kind() {
        let components = PackageComponents {
            package_name: "com.example.app".to_string(),
            components: vec![
                Component::new(ComponentKind::Activity, "com.example.app.Main"),
                Component::new(ComponentKind::Service, "com.example.app.Sync"),
                Component::new(ComponentKind::Activity, "com.example.app.Settings"),
            ],
        };

        assert_eq!(components.of_kind(ComponentKind::Activity).count(), 2);
        assert_eq!(components.of_kind(ComponentKind::Provider).count(), 0);
    }
}
