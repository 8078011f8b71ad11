//! Signature matching over component lists

use serde::Serialize;
use std::collections::HashSet;

use trackwall_components::{Component, ComponentKind};
use trackwall_signatures::SignatureDatabase;

use crate::tracker::Tracker;

#[derive(Debug, Clone, Default, Serialize)]
pub struct MatchReport {
    /// Sorted by component name, one entry per (kind, name)
    pub trackers: Vec<Tracker>,
    /// Components examined
    pub scanned: usize,
    /// Distinct trackers before keyword filtering
    pub matched: usize,
}

impl MatchReport {
    /// No tracker survived matching and filtering
    pub fn is_empty(&self) -> bool {
        self.trackers.is_empty()
    }
}

pub struct TrackerMatcher<'a> {
    signatures: &'a SignatureDatabase,
}

impl<'a> TrackerMatcher<'a> {
    pub fn new(signatures: &'a SignatureDatabase) -> Self {
        Self { signatures }
    }

    pub fn match_components(&self, components: &[Component], keyword: &str) -> MatchReport {
        let mut seen: HashSet<(ComponentKind, &str)> = HashSet::new();
        let mut trackers = Vec::new();

        for component in components {
            if !seen.insert((component.kind, component.name.as_str())) {
                continue;
            }

            if let Some(signature) = self.signatures.lookup(&component.name) {
                tracing::debug!(
                    component = %component.name,
                    kind = %component.kind,
                    signature = %signature.name,
                    "Tracker matched"
                );
                trackers.push(Tracker::from_match(component, signature));
            }
        }

        let matched = trackers.len();

        let keyword = keyword.to_lowercase();
        if !keyword.is_empty() {
            trackers.retain(|tracker| tracker.matches_keyword(&keyword));
        }

        trackers.sort_by(|a, b| {
            a.component_name
                .cmp(&b.component_name)
                .then(a.kind.cmp(&b.kind))
        });

        MatchReport {
            trackers,
            scanned: components.len(),
            matched,
        }
    }
}

/// Matched trackers for `components`, filtered by `keyword` when non-empty
pub fn match_trackers(
    components: &[Component],
    signatures: &SignatureDatabase,
    keyword: &str,
) -> Vec<Tracker> {
    TrackerMatcher::new(signatures)
        .match_components(components, keyword)
        .trackers
}
