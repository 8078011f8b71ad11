//! Tracker match result

use serde::{Deserialize, Serialize};

use trackwall_components::{Component, ComponentKind};
use trackwall_signatures::TrackerSignature;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tracker {
    /// Fully-qualified component class name
    pub component_name: String,
    pub kind: ComponentKind,
    /// Display name of the matched signature
    pub signature_name: String,
    pub signature_id: Option<String>,
    pub category: String,
    /// Present in the intent firewall under a blocking rule
    pub is_blocked: bool,
    /// Blocking rule also logs matched intents
    pub is_logged: bool,
    pub is_enabled: bool,
    pub is_exported: bool,
}

impl Tracker {
    pub fn from_match(component: &Component, signature: &TrackerSignature) -> Self {
        Self {
            component_name: component.name.clone(),
            kind: component.kind,
            signature_name: signature.name.clone(),
            signature_id: signature.id.clone(),
            category: signature.category.clone(),
            is_blocked: false,
            is_logged: false,
            is_enabled: component.enabled,
            is_exported: component.exported,
        }
    }

    pub fn is_activity(&self) -> bool {
        self.kind == ComponentKind::Activity
    }

    pub fn is_service(&self) -> bool {
        self.kind == ComponentKind::Service
    }

    pub fn is_receiver(&self) -> bool {
        self.kind == ComponentKind::Receiver
    }

    pub fn is_provider(&self) -> bool {
        self.kind == ComponentKind::Provider
    }

    /// Providers have no intent firewall rule element
    pub fn is_blockable(&self) -> bool {
        match self.kind {
            ComponentKind::Activity | ComponentKind::Service | ComponentKind::Receiver => true,
            ComponentKind::Provider => false,
        }
    }

    /// `component-filter` name for this tracker inside `package_name`
    pub fn filter_name(&self, package_name: &str) -> String {
        format!("{}/{}", package_name, self.component_name)
    }

    pub(crate) fn matches_keyword(&self, keyword_lower: &str) -> bool {
        self.component_name.to_lowercase().contains(keyword_lower)
            || self.category.to_lowercase().contains(keyword_lower)
            || self.signature_name.to_lowercase().contains(keyword_lower)
    }
}
