//! Rule store
//!
//! Block and unblock operations over `<rules_dir>/<package>.xml`. There is no
//! lock across calls; callers issue operations one at a time.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use trackwall_gateway::{GatewayError, PrivilegedGateway};
use trackwall_matcher::Tracker;

use crate::document::FirewallDocument;
use crate::error::RuleError;
use crate::tag::RuleTag;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnblockOutcome {
    /// Trackers with `is_blocked` cleared
    Unblocked(Vec<Tracker>),
    /// Nothing to unblock; no write happened
    NoRulesFile,
}

pub struct RuleStore {
    gateway: Arc<dyn PrivilegedGateway>,
    rules_dir: PathBuf,
}

impl RuleStore {
    pub fn new(gateway: Arc<dyn PrivilegedGateway>, rules_dir: impl Into<PathBuf>) -> Self {
        Self {
            gateway,
            rules_dir: rules_dir.into(),
        }
    }

    pub fn rules_dir(&self) -> &Path {
        &self.rules_dir
    }

    /// `<rules_dir>/<package>.xml`
    pub fn rules_path(&self, package_name: &str) -> Result<PathBuf> {
        let valid = !package_name.is_empty()
            && !package_name.contains("..")
            && package_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_');

        if !valid {
            return Err(RuleError::InvalidOperation(format!(
                "invalid package name: {:?}",
                package_name
            )));
        }

        Ok(self.rules_dir.join(format!("{}.xml", package_name)))
    }

    /// Block every tracker under the element for its kind.
    ///
    /// Providers are rejected before the file is touched. Returns the trackers
    /// with `is_blocked` set.
    pub fn block_trackers(&self, package_name: &str, trackers: &[Tracker]) -> Result<Vec<Tracker>> {
        let entries = trackers
            .iter()
            .map(|tracker| match RuleTag::for_kind(tracker.kind) {
                Some(tag) => Ok((tag, tracker.filter_name(package_name))),
                None => Err(RuleError::InvalidOperation(format!(
                    "{} is a {}; the intent firewall has no rule element for it",
                    tracker.component_name, tracker.kind
                ))),
            })
            .collect::<Result<Vec<_>>>()?;

        if entries.is_empty() {
            return Ok(Vec::new());
        }

        let path = self.rules_path(package_name)?;

        let logged = self.transact(&path, |document| {
            entries
                .iter()
                .map(|(tag, filter_name)| {
                    let replaced = document.block_component(*tag, filter_name);
                    if replaced > 0 {
                        tracing::debug!(filter = %filter_name, replaced, "Replaced existing filter");
                    }
                    document
                        .blocking_state(*tag, filter_name)
                        .unwrap_or(false)
                })
                .collect::<Vec<bool>>()
        })?;

        tracing::info!(
            package = %package_name,
            path = %path.display(),
            count = entries.len(),
            "Blocked trackers"
        );

        Ok(trackers
            .iter()
            .zip(logged)
            .map(|(tracker, is_logged)| Tracker {
                is_blocked: true,
                is_logged,
                ..tracker.clone()
            })
            .collect())
    }

    /// Remove every filter naming these trackers, wherever it sits
    pub fn unblock_trackers(&self, package_name: &str, trackers: &[Tracker]) -> Result<UnblockOutcome> {
        let path = self.rules_path(package_name)?;

        let exists = self
            .gateway
            .exists(&path)
            .map_err(|e| RuleError::acquire(path.clone(), e))?;

        if !exists {
            tracing::warn!(
                package = %package_name,
                path = %path.display(),
                "No rules file, nothing to unblock"
            );
            return Ok(UnblockOutcome::NoRulesFile);
        }

        let filter_names: Vec<String> = trackers
            .iter()
            .map(|tracker| tracker.filter_name(package_name))
            .collect();

        let removed = self.transact(&path, |document| {
            filter_names
                .iter()
                .map(|name| document.remove_filters(name))
                .sum::<usize>()
        })?;

        tracing::info!(
            package = %package_name,
            path = %path.display(),
            count = trackers.len(),
            removed,
            "Unblocked trackers"
        );

        Ok(UnblockOutcome::Unblocked(
            trackers
                .iter()
                .map(|tracker| Tracker {
                    is_blocked: false,
                    is_logged: false,
                    ..tracker.clone()
                })
                .collect(),
        ))
    }

    /// Current document, `None` when the file does not exist
    pub fn read_document(&self, package_name: &str) -> Result<Option<FirewallDocument>> {
        let path = self.rules_path(package_name)?;

        let exists = self
            .gateway
            .exists(&path)
            .map_err(|e| RuleError::acquire(path.clone(), e))?;
        if !exists {
            return Ok(None);
        }

        let bytes = self
            .gateway
            .read_all(&path)
            .map_err(|e| RuleError::acquire(path.clone(), e))?;

        FirewallDocument::from_bytes(&bytes).map(Some)
    }

    /// Set `is_blocked`/`is_logged` from the rules file.
    ///
    /// A tracker counts as blocked only when its filter sits under a
    /// `block="true"` element of its own tag.
    pub fn apply_rule_state(&self, package_name: &str, trackers: &mut [Tracker]) -> Result<()> {
        let document = self.read_document(package_name)?;

        for tracker in trackers.iter_mut() {
            let state = match (&document, RuleTag::for_kind(tracker.kind)) {
                (Some(document), Some(tag)) => {
                    document.blocking_state(tag, &tracker.filter_name(package_name))
                }
                _ => None,
            };

            tracker.is_blocked = state.is_some();
            tracker.is_logged = state.unwrap_or(false);
        }

        Ok(())
    }

    /// Acquire, parse, mutate, serialize, truncate and write.
    ///
    /// The new content is fully serialized before the file is truncated, so a
    /// parse or serialize failure leaves the file as it was.
    fn transact<F, T>(&self, path: &Path, mutate: F) -> Result<T>
    where
        F: FnOnce(&mut FirewallDocument) -> T,
    {
        let mut handle = self
            .gateway
            .open_read_write(path)
            .map_err(|e| RuleError::acquire(path.to_path_buf(), e))?;

        let bytes = handle.read_to_end().map_err(|source| RuleError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let mut document = FirewallDocument::from_bytes(&bytes)?;
        let output = mutate(&mut document);
        let xml = document.to_xml()?;

        let write_err = |source: GatewayError| RuleError::Write {
            path: path.to_path_buf(),
            source,
        };
        handle.truncate(0).map_err(write_err)?;
        handle.write(xml.as_bytes()).map_err(write_err)?;
        handle.close().map_err(write_err)?;

        tracing::debug!(path = %path.display(), bytes = xml.len(), "Wrote rules file");

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trackwall_components::ComponentKind;
    use trackwall_gateway::{LocalGateway, MemoryGateway};

    const PACKAGE: &str = "com.example.app";

    fn tracker(kind: ComponentKind, name: &str) -> Tracker {
        Tracker {
            component_name: name.to_string(),
            kind,
            signature_name: "Example Tracker".to_string(),
            signature_id: None,
            category: "analytics".to_string(),
            is_blocked: false,
            is_logged: false,
            is_enabled: true,
            is_exported: false,
        }
    }

    fn memory_store() -> (MemoryGateway, RuleStore) {
        let gateway = MemoryGateway::new();
        let store = RuleStore::new(Arc::new(gateway.clone()), "/data/system/ifw");
        (gateway, store)
    }

    fn document(gateway: &MemoryGateway, store: &RuleStore) -> FirewallDocument {
        let bytes = gateway
            .contents(&store.rules_path(PACKAGE).unwrap())
            .unwrap();
        FirewallDocument::from_bytes(&bytes).unwrap()
    }

    #[test]
    fn test_block_creates_file() {
        let (gateway, store) = memory_store();
        let activity = tracker(ComponentKind::Activity, "com.example.app.TrackerActivity");

        let blocked = store.block_trackers(PACKAGE, &[activity]).unwrap();
        assert_eq!(blocked.len(), 1);
        assert!(blocked[0].is_blocked);
        assert!(!blocked[0].is_logged);

        let doc = document(&gateway, &store);
        assert_eq!(
            doc.blocking_state(RuleTag::Activity, "com.example.app/com.example.app.TrackerActivity"),
            Some(false)
        );
    }

    #[test]
    fn test_block_is_idempotent() {
        let (gateway, store) = memory_store();
        let service = tracker(ComponentKind::Service, "com.tracker.Job");

        store.block_trackers(PACKAGE, &[service.clone()]).unwrap();
        store.block_trackers(PACKAGE, &[service]).unwrap();

        let doc = document(&gateway, &store);
        assert_eq!(doc.filter_count("com.example.app/com.tracker.Job"), 1);
        assert_eq!(doc.rule_sets().len(), 1);
    }

    #[test]
    fn test_block_two_kinds() {
        let (gateway, store) = memory_store();
        let trackers = vec![
            tracker(ComponentKind::Activity, "com.tracker.Ad"),
            tracker(ComponentKind::Service, "com.tracker.Job"),
        ];

        store.block_trackers(PACKAGE, &trackers).unwrap();

        let sets = document(&gateway, &store).rule_sets();
        assert_eq!(sets.len(), 2);
        let activity = sets.iter().find(|s| s.tag == RuleTag::Activity).unwrap();
        let service = sets.iter().find(|s| s.tag == RuleTag::Service).unwrap();
        assert_eq!(activity.filters.len(), 1);
        assert_eq!(service.filters.len(), 1);
        assert!(activity.block && !activity.log);
    }

    #[test]
    fn test_receiver_goes_to_broadcast() {
        let (gateway, store) = memory_store();
        store
            .block_trackers(PACKAGE, &[tracker(ComponentKind::Receiver, "com.tracker.Rx")])
            .unwrap();

        let sets = document(&gateway, &store).rule_sets();
        assert_eq!(sets[0].tag, RuleTag::Broadcast);
    }

    #[test]
    fn test_provider_rejected_without_write() {
        let (gateway, store) = memory_store();
        let trackers = vec![
            tracker(ComponentKind::Activity, "com.tracker.Ad"),
            tracker(ComponentKind::Provider, "com.tracker.InitProvider"),
        ];

        let err = store.block_trackers(PACKAGE, &trackers).unwrap_err();
        assert!(matches!(err, RuleError::InvalidOperation(_)));
        assert_eq!(gateway.write_count(), 0);
        assert!(gateway.contents(&store.rules_path(PACKAGE).unwrap()).is_none());
    }

    #[test]
    fn test_unblock_after_block() {
        let (gateway, store) = memory_store();
        let ad = tracker(ComponentKind::Activity, "com.tracker.Ad");
        let splash = tracker(ComponentKind::Activity, "com.tracker.Splash");

        store
            .block_trackers(PACKAGE, &[ad.clone(), splash.clone()])
            .unwrap();
        let before = document(&gateway, &store).rule_sets()[0].filters.len();

        let outcome = store.unblock_trackers(PACKAGE, &[ad]).unwrap();
        match outcome {
            UnblockOutcome::Unblocked(trackers) => assert!(!trackers[0].is_blocked),
            UnblockOutcome::NoRulesFile => panic!("Expected Unblocked"),
        }

        let doc = document(&gateway, &store);
        assert_eq!(doc.filter_count("com.example.app/com.tracker.Ad"), 0);
        assert_eq!(doc.rule_sets()[0].filters.len(), before - 1);
        assert_eq!(doc.filter_count("com.example.app/com.tracker.Splash"), 1);
    }

    #[test]
    fn test_unblock_without_rules_file() {
        let (gateway, store) = memory_store();
        let outcome = store
            .unblock_trackers(PACKAGE, &[tracker(ComponentKind::Service, "com.tracker.Job")])
            .unwrap();

        assert_eq!(outcome, UnblockOutcome::NoRulesFile);
        assert_eq!(gateway.write_count(), 0);
    }

    #[test]
    fn test_malformed_file_left_untouched() {
        let (gateway, store) = memory_store();
        let path = store.rules_path(PACKAGE).unwrap();
        gateway.insert(path.clone(), "<rules><activity></rules>");

        let err = store
            .block_trackers(PACKAGE, &[tracker(ComponentKind::Activity, "com.tracker.Ad")])
            .unwrap_err();
        assert!(matches!(err, RuleError::Parse(_)));
        assert_eq!(gateway.contents(&path).unwrap(), b"<rules><activity></rules>");
        assert_eq!(gateway.write_count(), 0);
    }

    #[test]
    fn test_permission_denied() {
        let (gateway, store) = memory_store();
        gateway.set_denied(true);
        let ad = tracker(ComponentKind::Activity, "com.tracker.Ad");

        let err = store.block_trackers(PACKAGE, &[ad.clone()]).unwrap_err();
        assert!(matches!(err, RuleError::PrivilegedAccess { .. }));
        assert!(err.to_string().contains("Could not acquire privileged file access"));

        let err = store.unblock_trackers(PACKAGE, &[ad]).unwrap_err();
        assert!(matches!(err, RuleError::PrivilegedAccess { .. }));
    }

    #[test]
    fn test_write_failure_reported() {
        let (gateway, store) = memory_store();
        let path = store.rules_path(PACKAGE).unwrap();
        gateway.insert(path.clone(), "<rules/>");
        gateway.set_read_only(true);

        let err = store
            .block_trackers(PACKAGE, &[tracker(ComponentKind::Activity, "com.tracker.Ad")])
            .unwrap_err();
        assert!(matches!(err, RuleError::Write { .. }));
        assert_eq!(gateway.contents(&path).unwrap(), b"<rules/>");
    }

    #[test]
    fn test_apply_rule_state() {
        let (gateway, store) = memory_store();
        gateway.insert(
            store.rules_path(PACKAGE).unwrap(),
            r#"<rules>
                <activity block="true" log="true"><component-filter name="com.example.app/com.tracker.Ad"/></activity>
                <service block="false"><component-filter name="com.example.app/com.tracker.Job"/></service>
                <activity block="true"><component-filter name="com.example.app/com.tracker.Rx"/></activity>
            </rules>"#,
        );

        let mut trackers = vec![
            tracker(ComponentKind::Activity, "com.tracker.Ad"),
            tracker(ComponentKind::Service, "com.tracker.Job"),
            tracker(ComponentKind::Receiver, "com.tracker.Rx"),
            tracker(ComponentKind::Provider, "com.tracker.Init"),
        ];
        trackers[1].is_blocked = true;

        store.apply_rule_state(PACKAGE, &mut trackers).unwrap();

        assert!(trackers[0].is_blocked && trackers[0].is_logged);
        assert!(!trackers[1].is_blocked);
        // Filed under the wrong tag, so the firewall would not block it
        assert!(!trackers[2].is_blocked);
        assert!(!trackers[3].is_blocked);
    }

    #[test]
    fn test_invalid_package_name() {
        let (_, store) = memory_store();
        assert!(matches!(
            store.rules_path("../../etc/passwd"),
            Err(RuleError::InvalidOperation(_))
        ));
    }

    #[test]
    fn test_local_gateway_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = RuleStore::new(Arc::new(LocalGateway::new()), dir.path().join("ifw"));
        let ad = tracker(ComponentKind::Activity, "com.tracker.Ad");

        store.block_trackers(PACKAGE, &[ad.clone()]).unwrap();
        let xml = std::fs::read_to_string(store.rules_path(PACKAGE).unwrap()).unwrap();
        assert!(xml.contains(r#"<component-filter name="com.example.app/com.tracker.Ad"/>"#));

        let mut trackers = vec![ad.clone()];
        store.apply_rule_state(PACKAGE, &mut trackers).unwrap();
        assert!(trackers[0].is_blocked);

        store.unblock_trackers(PACKAGE, &[ad]).unwrap();
        store.apply_rule_state(PACKAGE, &mut trackers).unwrap();
        assert!(!trackers[0].is_blocked);
    }
}
