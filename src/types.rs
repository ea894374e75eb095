//! Core data types shared by the source readers and the reconciler.

use std::collections::BTreeSet;
use std::path::PathBuf;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// The three places package state is read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SourceKind {
    /// `/var/lib/dpkg/extended_states`, apt's auto-installed marks
    ExtendedStates,
    /// `/var/log/apt/history.log*`
    History,
    /// `/var/lib/dpkg/status`
    Status,
}

/// One package entry read from a stanza-formatted state file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRecord {
    pub name: String,
    pub auto_installed: bool,
    pub installed: bool,
}

/// A package requested on an apt command line, as recorded in history.log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallEvent {
    pub package: String,
    /// `Start-Date:` of the history entry, when one preceded the command line
    pub timestamp: Option<NaiveDateTime>,
    pub log_file: PathBuf,
}

/// Sorted, de-duplicated set of manually installed package names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ManualSet(BTreeSet<String>);

impl ManualSet {
    /// `(installed sources united) - auto`
    pub fn reconcile<'a, I>(installed: I, auto: &BTreeSet<String>) -> Self
    where
        I: IntoIterator<Item = &'a BTreeSet<String>>,
    {
        let names = installed
            .into_iter()
            .flatten()
            .filter(|name| !auto.contains(*name))
            .cloned()
            .collect();
        Self(names)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Names in display order.
    pub fn into_sorted_vec(self) -> Vec<String> {
        self.0.into_iter().collect()
    }
}

/// Normalize a raw package token into a dpkg package name.
///
/// Strips whitespace and an `:arch` qualifier and lowercases. Returns `None`
/// for anything that is not a valid Debian package name.
pub fn normalize_package_name(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let name = raw.split_once(':').map_or(raw, |(name, _arch)| name);
    let name = name.to_ascii_lowercase();

    let mut chars = name.chars();
    let first = chars.next()?;
    if !first.is_ascii_alphanumeric() {
        return None;
    }
    if !chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '+' | '-'))
    {
        return None;
    }
    Some(name)
}
