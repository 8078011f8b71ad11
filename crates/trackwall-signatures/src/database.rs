//! Signature database
//!
//! Immutable after construction. Patterns are indexed once, longest first,
//! so a lookup is a single ordered scan that stops at the first hit.

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::builtin::BUILTIN_SIGNATURES;
use crate::signature::{RawSignature, TrackerSignature};
use crate::Result;

/// Two signatures whose patterns overlap (one contains the other).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatternOverlap {
    /// The more specific pattern; it wins when both match
    pub winner: String,
    pub winner_signature: String,
    pub shadowed: String,
    pub shadowed_signature: String,
}

#[derive(Debug, Clone, Default)]
pub struct SignatureDatabase {
    signatures: Vec<TrackerSignature>,
    /// Pattern -> index of the first signature that declared it
    by_pattern: BTreeMap<String, usize>,
    /// Patterns ordered by length (desc), then load order
    lookup_order: Vec<(String, usize)>,
}

impl SignatureDatabase {
    pub fn new(signatures: Vec<TrackerSignature>) -> Self {
        let mut by_pattern: BTreeMap<String, usize> = BTreeMap::new();
        let mut lookup_order = Vec::new();

        for (index, signature) in signatures.iter().enumerate() {
            for pattern in &signature.patterns {
                if let Some(&owner) = by_pattern.get(pattern) {
                    tracing::warn!(
                        pattern = %pattern,
                        kept = %signatures[owner].name,
                        ignored = %signature.name,
                        "Duplicate signature pattern"
                    );
                    continue;
                }
                by_pattern.insert(pattern.clone(), index);
                lookup_order.push((pattern.clone(), index));
            }
        }

        // Stable sort keeps load order among equal lengths
        lookup_order.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

        let db = Self {
            signatures,
            by_pattern,
            lookup_order,
        };

        for overlap in db.overlaps() {
            tracing::debug!(
                winner = %overlap.winner,
                winner_signature = %overlap.winner_signature,
                shadowed = %overlap.shadowed,
                shadowed_signature = %overlap.shadowed_signature,
                "Overlapping signature patterns"
            );
        }

        db
    }

    /// Database backed by the built-in signature table
    pub fn builtin() -> Self {
        let signatures = BUILTIN_SIGNATURES
            .iter()
            .filter_map(|(name, category, patterns)| {
                TrackerSignature::new(*name, patterns.iter().copied(), *category).ok()
            })
            .collect();
        Self::new(signatures)
    }

    /// Parse a JSON array of signatures
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: Vec<RawSignature> = serde_json::from_str(json)?;
        let signatures = raw
            .into_iter()
            .map(TrackerSignature::try_from)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(signatures))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let db = Self::from_json(&json)?;

        tracing::info!(
            path = %path.display(),
            signatures = db.len(),
            patterns = db.pattern_count(),
            "Loaded tracker signatures"
        );

        Ok(db)
    }

    /// Signature matching a fully-qualified class name.
    ///
    /// When several patterns match, the longest one decides; equal lengths
    /// fall back to load order.
    pub fn lookup(&self, class_name: &str) -> Option<&TrackerSignature> {
        self.lookup_order
            .iter()
            .find(|(pattern, _)| class_name.contains(pattern.as_str()))
            .map(|(_, index)| &self.signatures[*index])
    }

    pub fn signatures(&self) -> &[TrackerSignature] {
        &self.signatures
    }

    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }

    pub fn pattern_count(&self) -> usize {
        self.by_pattern.len()
    }

    /// Pattern pairs from different signatures where one contains the other
    pub fn overlaps(&self) -> Vec<PatternOverlap> {
        let mut overlaps = Vec::new();

        for (i, (longer, longer_owner)) in self.lookup_order.iter().enumerate() {
            for (shorter, shorter_owner) in &self.lookup_order[i + 1..] {
                if longer_owner == shorter_owner || !longer.contains(shorter.as_str()) {
                    continue;
                }
                overlaps.push(PatternOverlap {
                    winner: longer.clone(),
                    winner_signature: self.signatures[*longer_owner].name.clone(),
                    shadowed: shorter.clone(),
                    shadowed_signature: self.signatures[*shorter_owner].name.clone(),
                });
            }
        }

        overlaps
    }
}
