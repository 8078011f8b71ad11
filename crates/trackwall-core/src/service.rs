//! Tracker service
//!
//! Scans, block and unblock run on the blocking pool. Results land in three
//! single-slot channels (latest value replaces the previous one):
//! - the tracker list of the last scan
//! - the last single-tracker update
//! - the last warning
//!
//! Every call parses the rule file afresh; nothing about it is cached here.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;

use trackwall_components::{
    ComponentEnumerator, EnumerateComponents, InstalledManifests, ManifestArchive, PackageIdentity,
};
use trackwall_gateway::{LocalGateway, PrivilegedGateway};
use trackwall_matcher::{Tracker, TrackerMatcher};
use trackwall_rules::{FirewallDocument, RuleStore, UnblockOutcome};
use trackwall_signatures::SignatureDatabase;

use crate::config::Config;
use crate::error::CoreError;
use crate::Result;

/// Soft conditions and caught failures
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum Warning {
    NoTrackers,
    NoRulesFile,
    Failure(String),
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::NoTrackers => write!(f, "No trackers found"),
            Warning::NoRulesFile => write!(f, "No rules file, nothing to unblock"),
            Warning::Failure(message) => write!(f, "{}", message),
        }
    }
}

/// One tracker changed in place at a known list position
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackerUpdate {
    pub tracker: Tracker,
    pub position: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub package_name: String,
    pub trackers: Vec<Tracker>,
    /// Components examined
    pub scanned: usize,
    /// Trackers before keyword filtering
    pub matched: usize,
    pub keyword: String,
    pub scanned_at: DateTime<Utc>,
    /// Set when the rule file could not be read back; blocked flags are then unknown
    pub rule_state_error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ActionOutcome {
    /// Single tracker with a known position; no rescan happened
    Updated(TrackerUpdate),
    Rescanned(ScanReport),
    NoRulesFile,
}

pub struct TrackerService {
    package: PackageIdentity,
    signatures: Arc<SignatureDatabase>,
    enumerator: Arc<dyn EnumerateComponents>,
    /// Present only when privileged access is configured
    rules: Option<Arc<RuleStore>>,
    keyword: Arc<RwLock<String>>,
    trackers_tx: Arc<watch::Sender<Option<Vec<Tracker>>>>,
    tracker_tx: Arc<watch::Sender<Option<TrackerUpdate>>>,
    warning_tx: Arc<watch::Sender<Option<Warning>>>,
}

impl Clone for TrackerService {
    fn clone(&self) -> Self {
        Self {
            package: self.package.clone(),
            signatures: Arc::clone(&self.signatures),
            enumerator: Arc::clone(&self.enumerator),
            rules: self.rules.clone(),
            keyword: Arc::clone(&self.keyword),
            trackers_tx: Arc::clone(&self.trackers_tx),
            tracker_tx: Arc::clone(&self.tracker_tx),
            warning_tx: Arc::clone(&self.warning_tx),
        }
    }
}

impl TrackerService {
    pub fn new(
        config: &Config,
        package: PackageIdentity,
        signatures: Arc<SignatureDatabase>,
        enumerator: Arc<dyn EnumerateComponents>,
        gateway: Arc<dyn PrivilegedGateway>,
    ) -> Self {
        let rules = config
            .use_privileged_access
            .then(|| Arc::new(RuleStore::new(gateway, config.rules_dir.clone())));

        let (trackers_tx, _) = watch::channel(None);
        let (tracker_tx, _) = watch::channel(None);
        let (warning_tx, _) = watch::channel(None);

        Self {
            package,
            signatures,
            enumerator,
            rules,
            keyword: Arc::new(RwLock::new(String::new())),
            trackers_tx: Arc::new(trackers_tx),
            tracker_tx: Arc::new(tracker_tx),
            warning_tx: Arc::new(warning_tx),
        }
    }

    /// Service wired to the local filesystem: manifests under
    /// `manifests_dir`, signatures from `signatures_path` or the built-in table.
    pub fn from_config(config: &Config, package: PackageIdentity) -> Result<Self> {
        let signatures = match &config.signatures_path {
            Some(path) => SignatureDatabase::load(path)?,
            None => SignatureDatabase::builtin(),
        };

        let enumerator =
            ComponentEnumerator::new(InstalledManifests::new(config.manifests_dir.clone()), ManifestArchive);

        Ok(Self::new(
            config,
            package,
            Arc::new(signatures),
            Arc::new(enumerator),
            Arc::new(LocalGateway::new()),
        ))
    }

    pub fn package(&self) -> &PackageIdentity {
        &self.package
    }

    pub fn keyword(&self) -> String {
        self.keyword.read().clone()
    }

    pub fn has_privileged_access(&self) -> bool {
        self.rules.is_some()
    }

    // === Channels ===

    pub fn subscribe_trackers(&self) -> watch::Receiver<Option<Vec<Tracker>>> {
        self.trackers_tx.subscribe()
    }

    pub fn subscribe_tracker(&self) -> watch::Receiver<Option<TrackerUpdate>> {
        self.tracker_tx.subscribe()
    }

    pub fn subscribe_warnings(&self) -> watch::Receiver<Option<Warning>> {
        self.warning_tx.subscribe()
    }

    /// Reset the single-tracker slot once the update has been consumed
    pub fn clear_tracker(&self) {
        self.tracker_tx.send_replace(None);
    }

    pub fn clear_warning(&self) {
        self.warning_tx.send_replace(None);
    }

    // === Operations ===

    pub async fn scan(&self) -> Result<ScanReport> {
        let this = self.clone();
        let result = run_blocking(move || this.scan_blocking()).await;

        match result {
            Ok(report) => {
                tracing::info!(
                    package = %report.package_name,
                    scanned = report.scanned,
                    trackers = report.trackers.len(),
                    "Scan complete"
                );
                if report.trackers.is_empty() {
                    tracing::warn!(package = %report.package_name, "No trackers found");
                    self.warning_tx.send_replace(Some(Warning::NoTrackers));
                }
                self.trackers_tx.send_replace(Some(report.trackers.clone()));
                Ok(report)
            }
            Err(e) => Err(self.fail("scan", e)),
        }
    }

    /// Store the keyword and rescan with it
    pub async fn set_keyword(&self, keyword: impl Into<String>) -> Result<ScanReport> {
        let keyword = keyword.into();
        tracing::debug!(keyword = %keyword, "Keyword changed");
        *self.keyword.write() = keyword;
        self.scan().await
    }

    /// Block `trackers`. With exactly one tracker and a known position the
    /// update is published on the single-tracker slot instead of rescanning.
    pub async fn block(&self, trackers: Vec<Tracker>, position: Option<usize>) -> Result<ActionOutcome> {
        let store = match self.rule_store() {
            Ok(store) => store,
            Err(e) => return Err(self.fail("block", e)),
        };

        let package_name = self.package.package_name.clone();
        let result = run_blocking(move || {
            store
                .block_trackers(&package_name, &trackers)
                .map_err(CoreError::from)
        })
        .await;

        match result {
            Ok(blocked) => self.finish_action(blocked, position).await,
            Err(e) => Err(self.fail("block", e)),
        }
    }

    pub async fn unblock(&self, trackers: Vec<Tracker>, position: Option<usize>) -> Result<ActionOutcome> {
        let store = match self.rule_store() {
            Ok(store) => store,
            Err(e) => return Err(self.fail("unblock", e)),
        };

        let package_name = self.package.package_name.clone();
        let result = run_blocking(move || {
            store
                .unblock_trackers(&package_name, &trackers)
                .map_err(CoreError::from)
        })
        .await;

        match result {
            Ok(UnblockOutcome::Unblocked(unblocked)) => self.finish_action(unblocked, position).await,
            Ok(UnblockOutcome::NoRulesFile) => {
                self.warning_tx.send_replace(Some(Warning::NoRulesFile));
                Ok(ActionOutcome::NoRulesFile)
            }
            Err(e) => Err(self.fail("unblock", e)),
        }
    }

    /// Current rule document for the package, `None` when there is no file
    pub async fn read_rules(&self) -> Result<Option<FirewallDocument>> {
        let store = match self.rule_store() {
            Ok(store) => store,
            Err(e) => return Err(self.fail("read_rules", e)),
        };

        let package_name = self.package.package_name.clone();
        let result = run_blocking(move || {
            store
                .read_document(&package_name)
                .map_err(CoreError::from)
        })
        .await;

        result.map_err(|e| self.fail("read_rules", e))
    }

    fn scan_blocking(&self) -> Result<ScanReport> {
        let components = self.enumerator.enumerate(&self.package)?;
        let keyword = self.keyword();

        let report = TrackerMatcher::new(&self.signatures).match_components(&components.components, &keyword);
        let mut trackers = report.trackers;

        let mut rule_state_error = None;
        if let Some(store) = &self.rules {
            if let Err(e) = store.apply_rule_state(&self.package.package_name, &mut trackers) {
                tracing::warn!(
                    package = %self.package.package_name,
                    error = %e,
                    "Could not read back rule state"
                );
                rule_state_error = Some(e.to_string());
            }
        }

        Ok(ScanReport {
            package_name: self.package.package_name.clone(),
            trackers,
            scanned: report.scanned,
            matched: report.matched,
            keyword,
            scanned_at: Utc::now(),
            rule_state_error,
        })
    }

    async fn finish_action(&self, trackers: Vec<Tracker>, position: Option<usize>) -> Result<ActionOutcome> {
        match (trackers.as_slice(), position) {
            ([tracker], Some(position)) => {
                let update = TrackerUpdate {
                    tracker: tracker.clone(),
                    position,
                };

                self.trackers_tx.send_if_modified(|slot| {
                    match slot.as_mut().and_then(|list| list.get_mut(position)) {
                        Some(entry)
                            if entry.kind == tracker.kind
                                && entry.component_name == tracker.component_name =>
                        {
                            *entry = tracker.clone();
                            true
                        }
                        _ => false,
                    }
                });
                self.tracker_tx.send_replace(Some(update.clone()));

                tracing::debug!(
                    component = %update.tracker.component_name,
                    position,
                    blocked = update.tracker.is_blocked,
                    "Tracker updated in place"
                );
                Ok(ActionOutcome::Updated(update))
            }
            _ => Ok(ActionOutcome::Rescanned(self.scan().await?)),
        }
    }

    fn rule_store(&self) -> Result<Arc<RuleStore>> {
        self.rules
            .clone()
            .ok_or(CoreError::PrivilegedAccessUnavailable)
    }

    /// Log a failure caught at the operation boundary and publish it
    fn fail(&self, operation: &str, error: CoreError) -> CoreError {
        tracing::error!(
            package = %self.package.package_name,
            operation,
            error = %error,
            "Operation failed"
        );
        self.warning_tx
            .send_replace(Some(Warning::Failure(error.to_string())));
        error
    }
}

async fn run_blocking<F, T>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| CoreError::Task(e.to_string()))?
}
