//! Command handlers
//!
//! Each handler resolves to a `CommandResult`, printed as JSON by `main`.

use serde::Serialize;

use trackwall_core::{ActionOutcome, RuleSet, ScanReport, Tracker, TrackerService};

#[derive(Debug, Clone, Serialize)]
pub struct CommandResult<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> CommandResult<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(error: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RuleSetInfo {
    pub tag: String,
    pub block: bool,
    pub log: bool,
    pub filters: Vec<String>,
}

impl From<RuleSet> for RuleSetInfo {
    fn from(rule_set: RuleSet) -> Self {
        Self {
            tag: rule_set.tag.as_str().to_string(),
            block: rule_set.block,
            log: rule_set.log,
            filters: rule_set.filters.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RulesInfo {
    pub package_name: String,
    pub exists: bool,
    pub rule_sets: Vec<RuleSetInfo>,
}

pub async fn scan(service: &TrackerService, keyword: Option<String>) -> CommandResult<ScanReport> {
    let result = match keyword {
        Some(keyword) => service.set_keyword(keyword).await,
        None => service.scan().await,
    };

    match result {
        Ok(report) => CommandResult::ok(report),
        Err(e) => CommandResult::err(e.to_string()),
    }
}

pub async fn block(service: &TrackerService, components: &[String]) -> CommandResult<ActionOutcome> {
    let (trackers, position) = match select(service, components).await {
        Ok(selection) => selection,
        Err(e) => return CommandResult::err(e),
    };

    match service.block(trackers, position).await {
        Ok(outcome) => CommandResult::ok(outcome),
        Err(e) => CommandResult::err(e.to_string()),
    }
}

pub async fn unblock(service: &TrackerService, components: &[String]) -> CommandResult<ActionOutcome> {
    let (trackers, position) = match select(service, components).await {
        Ok(selection) => selection,
        Err(e) => return CommandResult::err(e),
    };

    match service.unblock(trackers, position).await {
        Ok(outcome) => CommandResult::ok(outcome),
        Err(e) => CommandResult::err(e.to_string()),
    }
}

pub async fn rules(service: &TrackerService) -> CommandResult<RulesInfo> {
    let package_name = service.package().package_name.clone();

    match service.read_rules().await {
        Ok(Some(document)) => CommandResult::ok(RulesInfo {
            package_name,
            exists: true,
            rule_sets: document.rule_sets().into_iter().map(RuleSetInfo::from).collect(),
        }),
        Ok(None) => CommandResult::ok(RulesInfo {
            package_name,
            exists: false,
            rule_sets: Vec::new(),
        }),
        Err(e) => CommandResult::err(e.to_string()),
    }
}

/// Scan, then pick the trackers named on the command line.
///
/// A single selection also yields its list position so the service can
/// update it in place.
async fn select(
    service: &TrackerService,
    components: &[String],
) -> std::result::Result<(Vec<Tracker>, Option<usize>), String> {
    let report = service.scan().await.map_err(|e| e.to_string())?;

    let mut selected = Vec::new();
    let mut positions = Vec::new();
    for name in components {
        let matches: Vec<(usize, &Tracker)> = report
            .trackers
            .iter()
            .enumerate()
            .filter(|(_, tracker)| &tracker.component_name == name)
            .collect();

        if matches.is_empty() {
            return Err(format!("{} is not a detected tracker of {}", name, report.package_name));
        }

        for (position, tracker) in matches {
            positions.push(position);
            selected.push(tracker.clone());
        }
    }

    let position = match positions.as_slice() {
        [position] => Some(*position),
        _ => None,
    };

    Ok((selected, position))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use trackwall_core::RuleTag;

    #[test]
    fn test_envelope_shape() {
        let ok = serde_json::to_value(CommandResult::ok(1)).unwrap();
        assert_eq!(ok["success"], true);
        assert_eq!(ok["data"], 1);
        assert!(ok["error"].is_null());

        let err = serde_json::to_value(CommandResult::<()>::err("boom".to_string())).unwrap();
        assert_eq!(err["success"], false);
        assert_eq!(err["error"], "boom");
    }

    #[test]
    fn test_rule_set_info() {
        let info = RuleSetInfo::from(RuleSet {
            tag: RuleTag::Broadcast,
            block: true,
            log: false,
            filters: BTreeSet::from(["pkg/b".to_string(), "pkg/a".to_string()]),
        });

        assert_eq!(info.tag, "broadcast");
        assert_eq!(info.filters, vec!["pkg/a", "pkg/b"]);
    }
}
