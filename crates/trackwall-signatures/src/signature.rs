//! Tracker signature data structure

use serde::{Deserialize, Serialize};

use crate::error::SignatureError;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerSignature {
    /// Stable identifier from the source data, if it had one
    pub id: Option<String>,
    /// Display name of the tracking library
    pub name: String,
    /// Class-name fragments identifying the library
    pub patterns: Vec<String>,
    /// Category tag ("analytics", "advertisement", ...)
    pub category: String,
    pub website: Option<String>,
}

impl TrackerSignature {
    pub fn new<I, S>(name: impl Into<String>, patterns: I, category: impl Into<String>) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(SignatureError::MissingName);
        }

        let patterns = normalize_patterns(patterns.into_iter().map(Into::into));
        if patterns.is_empty() {
            return Err(SignatureError::NoPatterns(name));
        }

        Ok(Self {
            id: None,
            name,
            patterns,
            category: category.into(),
            website: None,
        })
    }
}

/// Trims patterns, drops blanks and duplicates, keeps first-seen order.
pub(crate) fn normalize_patterns<I>(patterns: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut out: Vec<String> = Vec::new();
    for pattern in patterns {
        let pattern = pattern.trim();
        if pattern.is_empty() || out.iter().any(|p| p == pattern) {
            continue;
        }
        out.push(pattern.to_string());
    }
    out
}

/// On-disk shape of a signature entry.
///
/// Accepts both an explicit `patterns` list and an Exodus-style
/// pipe-separated `code_signature`.
#[derive(Debug, Deserialize)]
pub(crate) struct RawSignature {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub patterns: Vec<String>,
    #[serde(default)]
    pub code_signature: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub website: Option<String>,
}

impl TryFrom<RawSignature> for TrackerSignature {
    type Error = SignatureError;

    fn try_from(raw: RawSignature) -> Result<Self> {
        let mut patterns = raw.patterns;
        if let Some(code_signature) = raw.code_signature {
            patterns.extend(code_signature.split('|').map(str::to_string));
        }

        let category = raw
            .category
            .or_else(|| raw.categories.into_iter().next())
            .unwrap_or_default();

        let mut signature = TrackerSignature::new(raw.name, patterns, category)?;
        signature.id = raw.id.map(|id| match id {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        });
        signature.website = raw.website.filter(|w| !w.is_empty());
        Ok(signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_blank_patterns() {
        let err = TrackerSignature::new("Empty", ["", "  "], "analytics").unwrap_err();
        assert!(matches!(err, SignatureError::NoPatterns(name) if name == "Empty"));

        let err = TrackerSignature::new(" ", ["com.x."], "analytics").unwrap_err();
        assert!(matches!(err, SignatureError::MissingName));
    }

    #[test]
    fn test_raw_code_signature_split() {
        let raw: RawSignature = serde_json::from_str(
            r#"{
                "id": 27,
                "name": "Flurry",
                "code_signature": "com.flurry.|com.flurry.android.",
                "categories": ["Analytics", "Advertisement"]
            }"#,
        )
        .unwrap();

        let signature = TrackerSignature::try_from(raw).unwrap();
        assert_eq!(signature.id.as_deref(), Some("27"));
        assert_eq!(signature.patterns, vec!["com.flurry.", "com.flurry.android."]);
        assert_eq!(signature.category, "Analytics");
    }
}
