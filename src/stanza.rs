//! Debian control-file ("stanza") parser
//!
//! Both `/var/lib/dpkg/status` and `/var/lib/dpkg/extended_states` are lists of
//! blank-line-separated records made of `Key: Value` lines. This module parses
//! that shared format once; the per-file readers only choose a [`StanzaRule`].
//!
//! Parsing is best-effort: a malformed line is dropped, a stanza without a
//! usable `Package` field is dropped, and nothing here ever fails.

use tracing::trace;

use crate::types::{normalize_package_name, PackageRecord};

/// Status words dpkg uses for a package whose files are on disk and configured
/// (or waiting only on triggers).
const INSTALLED_STATES: &[&str] = &["installed", "triggers-awaited", "triggers-pending"];

/// One `Key: Value` record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stanza {
    fields: Vec<(String, String)>,
}

impl Stanza {
    /// Value of `field`, matched case-insensitively.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .iter()
            .rev()
            .find(|(key, _)| key.eq_ignore_ascii_case(field))
            .map(|(_, value)| value.as_str())
    }

    /// Normalized `Package` name, if present and valid.
    pub fn package(&self) -> Option<String> {
        self.get("Package").and_then(normalize_package_name)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn insert(&mut self, key: &str, value: &str) {
        self.fields.retain(|(k, _)| !k.eq_ignore_ascii_case(key));
        self.fields.push((key.to_string(), value.to_string()));
    }

    fn continue_last(&mut self, line: &str) -> bool {
        match self.fields.last_mut() {
            Some((_, value)) => {
                value.push('\n');
                value.push_str(line.trim());
                true
            }
            None => false,
        }
    }
}

/// Split `text` into stanzas.
pub fn parse_stanzas(text: &str) -> Vec<Stanza> {
    let mut stanzas = Vec::new();
    let mut current = Stanza::default();

    for (lineno, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                stanzas.push(std::mem::take(&mut current));
            }
            continue;
        }
        if line.starts_with('#') {
            continue;
        }
        if line.starts_with([' ', '\t']) {
            if !current.continue_last(line) {
                trace!(line = lineno + 1, "continuation line with no field, skipped");
            }
            continue;
        }
        match line.split_once(':') {
            Some((key, value)) if !key.trim().is_empty() => {
                current.insert(key.trim(), value.trim());
            }
            _ => trace!(line = lineno + 1, "malformed stanza line, skipped"),
        }
    }
    if !current.is_empty() {
        stanzas.push(current);
    }

    stanzas
}

/// How a stanza decides between automatic and manual.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StanzaRule {
    /// `extended_states`: auto iff `Auto-Installed: 1`
    AutoInstalledFlag,
    /// `status`: installed from the `Status` words, auto from an `auto*` word
    /// or an `Auto-Installed: 1` field
    DpkgStatus,
}

impl StanzaRule {
    /// Turn a stanza into a record, or `None` when the rule rejects it.
    pub fn apply(self, stanza: &Stanza) -> Option<PackageRecord> {
        let name = stanza.package()?;
        let auto_flag = stanza.get("Auto-Installed") == Some("1");

        let (auto_installed, installed) = match self {
            StanzaRule::AutoInstalledFlag => (auto_flag, true),
            StanzaRule::DpkgStatus => {
                let words: Vec<&str> = stanza.get("Status")?.split_whitespace().collect();
                let installed = words.iter().any(|w| INSTALLED_STATES.contains(w));
                let auto = auto_flag || words.iter().any(|w| w.starts_with("auto"));
                if !installed && !auto {
                    return None;
                }
                (auto, installed)
            }
        };

        Some(PackageRecord {
            name,
            auto_installed,
            installed,
        })
    }
}

/// Parse `text` and keep the records `rule` accepts.
pub fn records(text: &str, rule: StanzaRule) -> Vec<PackageRecord> {
    parse_stanzas(text)
        .iter()
        .filter_map(|stanza| {
            let record = rule.apply(stanza);
            if record.is_none() {
                trace!(package = ?stanza.get("Package"), ?rule, "stanza skipped");
            }
            record
        })
        .collect()
}
