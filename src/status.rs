//! Reader for the dpkg database at `/var/lib/dpkg/status`.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{MypkgsError, Result};
use crate::stanza::{records, StanzaRule};
use crate::types::PackageRecord;

/// Read the installed (or automatic-flagged) records from a dpkg status file.
pub fn read_dpkg_status(path: &Path) -> Result<Vec<PackageRecord>> {
    let bytes = fs::read(path).map_err(|e| MypkgsError::read(path, e))?;
    let text = String::from_utf8_lossy(&bytes);
    let recs = records(&text, StanzaRule::DpkgStatus);
    debug!(path = %path.display(), records = recs.len(), "parsed dpkg status");
    Ok(recs)
}

/// Installed packages that are not flagged automatic.
pub fn parse_dpkg_status(path: &Path) -> Result<BTreeSet<String>> {
    Ok(split_status(read_dpkg_status(path)?).0)
}

/// Packages the status file flags as automatic.
pub fn dpkg_status_auto(path: &Path) -> Result<BTreeSet<String>> {
    Ok(split_status(read_dpkg_status(path)?).1)
}

/// Split status records into `(manual installed, automatic)` name sets.
pub fn split_status(recs: Vec<PackageRecord>) -> (BTreeSet<String>, BTreeSet<String>) {
    let mut manual = BTreeSet::new();
    let mut auto = BTreeSet::new();
    for rec in recs {
        if rec.auto_installed {
            auto.insert(rec.name);
        } else if rec.installed {
            manual.insert(rec.name);
        }
    }
    // A multiarch package flagged automatic for one architecture is automatic.
    manual.retain(|name| !auto.contains(name));
    (manual, auto)
}
