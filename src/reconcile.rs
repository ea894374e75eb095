//! Package state reconciliation
//!
//! Combines the three sources into the list of packages the user installed by
//! hand:
//!
//! ```text
//! manual = (history installs ∪ dpkg status manual) − (extended_states auto ∪ dpkg status auto)
//! ```
//!
//! Each source is read independently. A source that cannot be read is recorded
//! as a [`SourceFailure`] and reported as a warning; the result is then built
//! from whatever did load. Only when nothing loads is it an error.
//!
//! History entries are not matched against later removals, so a package that
//! was installed and then purged can still be listed.

use std::collections::BTreeSet;

use tracing::{info, warn};

use crate::config::SourcePaths;
use crate::error::{MypkgsError, Result, SourceFailure};
use crate::extended_states::parse_extended_states;
use crate::history::{discover_history_logs, scan_history_logs, HistoryScan};
use crate::status::{read_dpkg_status, split_status};
use crate::types::{InstallEvent, ManualSet, SourceKind};

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Default)]
pub struct Report {
    pub manual: ManualSet,
    /// Install events from the history logs, oldest log first
    pub events: Vec<InstallEvent>,
    pub failures: Vec<SourceFailure>,
    pub sources_read: Vec<SourceKind>,
}

impl Report {
    /// Manual packages, sorted for display.
    pub fn packages(&self) -> Vec<String> {
        self.manual.clone().into_sorted_vec()
    }

    /// Manual packages as a pretty-printed JSON array.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.manual)?)
    }

    /// History install events as a pretty-printed JSON array.
    pub fn events_to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.events)?)
    }

    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Reads the configured sources and computes the manual package set.
#[derive(Debug, Clone, Default)]
pub struct PackageStateReconciler {
    paths: SourcePaths,
}

impl PackageStateReconciler {
    pub fn new(paths: SourcePaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &SourcePaths {
        &self.paths
    }

    /// Auto-installed names from extended_states.
    pub fn parse_extended_states(&self) -> Result<BTreeSet<String>> {
        parse_extended_states(&self.paths.extended_states)
    }

    /// Discover and scan the history logs.
    ///
    /// Individual unreadable logs are skipped; this fails only when no log
    /// could be read at all.
    pub fn parse_apt_history_logs(&self) -> std::result::Result<HistoryScan, SourceFailure> {
        let dir = &self.paths.history_dir;
        let logs = discover_history_logs(dir)
            .map_err(|e| SourceFailure::new(SourceKind::History, dir, e.to_string()))?;
        if logs.is_empty() {
            return Err(SourceFailure::new(
                SourceKind::History,
                dir,
                "no history.log files found",
            ));
        }

        let scan = scan_history_logs(&logs);
        if scan.files_read == 0 {
            return Err(SourceFailure::new(
                SourceKind::History,
                dir,
                format!("none of {} history logs could be read", logs.len()),
            ));
        }
        Ok(scan)
    }

    /// `(manual installed, automatic)` names from the dpkg status file.
    pub fn parse_dpkg_status(&self) -> Result<(BTreeSet<String>, BTreeSet<String>)> {
        Ok(split_status(read_dpkg_status(&self.paths.dpkg_status)?))
    }

    /// Run every source and reconcile.
    pub fn compute(&self) -> Result<Report> {
        let mut report = Report::default();
        let mut auto = BTreeSet::new();
        let mut installed: Vec<BTreeSet<String>> = Vec::new();

        match self.parse_extended_states() {
            Ok(names) => {
                info!(auto = names.len(), "extended_states loaded");
                auto.extend(names);
                report.sources_read.push(SourceKind::ExtendedStates);
            }
            Err(e) => report.failures.push(self.failure(SourceKind::ExtendedStates, e)),
        }

        match self.parse_apt_history_logs() {
            Ok(scan) => {
                info!(
                    files = scan.files_read,
                    skipped = scan.files_skipped,
                    packages = scan.packages.len(),
                    "history logs loaded"
                );
                installed.push(scan.packages);
                report.events = scan.events;
                report.sources_read.push(SourceKind::History);
            }
            Err(failure) => report.failures.push(failure),
        }

        match self.parse_dpkg_status() {
            Ok((manual, status_auto)) => {
                info!(
                    manual = manual.len(),
                    auto = status_auto.len(),
                    "dpkg status loaded"
                );
                installed.push(manual);
                auto.extend(status_auto);
                report.sources_read.push(SourceKind::Status);
            }
            Err(e) => report.failures.push(self.failure(SourceKind::Status, e)),
        }

        for failure in &report.failures {
            warn!("skipping {}", failure);
        }
        if report.sources_read.is_empty() {
            return Err(MypkgsError::NoSources {
                failures: report.failures,
            });
        }

        report.manual = ManualSet::reconcile(&installed, &auto);
        info!(
            manual = report.manual.len(),
            sources = report.sources_read.len(),
            "reconciled"
        );
        Ok(report)
    }

    /// Sorted manual package names.
    pub fn compute_manual_list(&self) -> Result<Vec<String>> {
        Ok(self.compute()?.packages())
    }

    fn failure(&self, kind: SourceKind, err: MypkgsError) -> SourceFailure {
        let path = match kind {
            SourceKind::ExtendedStates => &self.paths.extended_states,
            SourceKind::History => &self.paths.history_dir,
            SourceKind::Status => &self.paths.dpkg_status,
        };
        let reason = match err {
            MypkgsError::Read { source, .. } => source.to_string(),
            other => other.to_string(),
        };
        SourceFailure::new(kind, path, reason)
    }
}
