//! Reader for apt's `/var/lib/dpkg/extended_states`.
//!
//! apt records which packages it pulled in as dependencies here. Only entries
//! with `Auto-Installed: 1` matter; everything else in the file is ignored.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{MypkgsError, Result};
use crate::stanza::{records, StanzaRule};
use crate::types::PackageRecord;

/// Read every package record from an extended_states file.
pub fn read_extended_states(path: &Path) -> Result<Vec<PackageRecord>> {
    let bytes = fs::read(path).map_err(|e| MypkgsError::read(path, e))?;
    let text = String::from_utf8_lossy(&bytes);
    let recs = records(&text, StanzaRule::AutoInstalledFlag);
    debug!(path = %path.display(), records = recs.len(), "parsed extended_states");
    Ok(recs)
}

/// Names apt marked as automatically installed.
pub fn parse_extended_states(path: &Path) -> Result<BTreeSet<String>> {
    Ok(read_extended_states(path)?
        .into_iter()
        .filter(|r| r.auto_installed)
        .map(|r| r.name)
        .collect())
}
