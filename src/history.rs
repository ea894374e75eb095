//! apt history log scanner
//!
//! apt appends one entry per run to `/var/log/apt/history.log`; logrotate
//! renames it to `history.log.1` and gzips older generations
//! (`history.log.2.gz`, ...). An entry looks like:
//!
//! ```text
//! Start-Date: 2024-03-02  14:05:11
//! Commandline: apt install vim git
//! Requested-By: alice (1000)
//! Install: vim:amd64 (2:9.0.1378-2), git:amd64 (1:2.39.2-1.1)
//! End-Date: 2024-03-02  14:05:19
//! ```
//!
//! Only the `Commandline:` line is trusted: it names what the user asked for,
//! while `Install:` also lists every dependency pulled in along the way.
//!
//! Log files are optional. A missing, unreadable or corrupt file is skipped
//! and only shows up at debug level.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use flate2::read::MultiGzDecoder;
use glob::{glob, Pattern};
use tracing::{debug, trace};

use crate::error::{MypkgsError, Result};
use crate::types::{normalize_package_name, InstallEvent};

/// Live log file name; rotated generations share this prefix.
pub const HISTORY_LOG_NAME: &str = "history.log";

const START_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// apt/apt-get options whose value is a separate argument.
const OPTIONS_WITH_VALUE: &[&str] = &[
    "-t",
    "-o",
    "-c",
    "--target-release",
    "--default-release",
    "--option",
    "--config-file",
];

/// Result of scanning a set of history logs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryScan {
    /// Every package named on an install command line
    pub packages: BTreeSet<String>,
    /// One event per package per command line, in log order
    pub events: Vec<InstallEvent>,
    pub files_read: usize,
    pub files_skipped: usize,
}

/// Find `history.log*` in `dir`, oldest generation first.
pub fn discover_history_logs(dir: &Path) -> Result<Vec<PathBuf>> {
    let pattern = format!(
        "{}/{}*",
        Pattern::escape(&dir.to_string_lossy()),
        HISTORY_LOG_NAME
    );
    debug!(pattern = %pattern, "scanning for apt history logs");

    let mut logs: Vec<PathBuf> = glob(&pattern)
        .map_err(|e| MypkgsError::Glob(e.to_string()))?
        .filter_map(|entry| match entry {
            Ok(path) if path.is_file() => Some(path),
            Ok(_) => None,
            Err(e) => {
                debug!(error = %e, "unreadable glob entry, skipped");
                None
            }
        })
        .collect();

    logs.sort_by(|a, b| {
        rotation_index(b)
            .cmp(&rotation_index(a))
            .then_with(|| a.cmp(b))
    });
    Ok(logs)
}

/// `history.log` -> 0, `history.log.3` / `history.log.3.gz` -> 3.
fn rotation_index(path: &Path) -> u32 {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.strip_prefix(HISTORY_LOG_NAME)
        .map(|rest| rest.strip_suffix(".gz").unwrap_or(rest))
        .and_then(|rest| rest.strip_prefix('.'))
        .and_then(|n| n.parse().ok())
        .unwrap_or(0)
}

/// Package names the user asked apt to install, across all `paths`.
pub fn parse_apt_history_logs<P: AsRef<Path>>(paths: &[P]) -> BTreeSet<String> {
    scan_history_logs(paths).packages
}

/// Scan every log in `paths`, skipping the ones that cannot be read.
pub fn scan_history_logs<P: AsRef<Path>>(paths: &[P]) -> HistoryScan {
    let mut scan = HistoryScan::default();

    for path in paths {
        let path = path.as_ref();
        match read_log(path) {
            Ok(text) => {
                let before = scan.events.len();
                scan_log_text(&text, path, &mut scan.events);
                debug!(
                    path = %path.display(),
                    events = scan.events.len() - before,
                    "scanned history log"
                );
                scan.files_read += 1;
            }
            Err(e) => {
                debug!(path = %path.display(), error = %e, "history log skipped");
                scan.files_skipped += 1;
            }
        }
    }

    scan.packages = scan.events.iter().map(|e| e.package.clone()).collect();
    scan
}

/// Read a log, decompressing `.gz` generations.
fn read_log(path: &Path) -> io::Result<String> {
    let file = File::open(path)?;
    let mut bytes = Vec::new();
    if path.extension().is_some_and(|ext| ext == "gz") {
        MultiGzDecoder::new(file).read_to_end(&mut bytes)?;
    } else {
        let mut file = file;
        file.read_to_end(&mut bytes)?;
    }
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Append an [`InstallEvent`] for each package on each install command line.
pub fn scan_log_text(text: &str, log_file: &Path, events: &mut Vec<InstallEvent>) {
    let mut started: Option<NaiveDateTime> = None;

    for line in text.lines() {
        let line = line.trim_start();
        if line.is_empty() {
            started = None;
        } else if let Some(date) = line.strip_prefix("Start-Date:") {
            started = parse_start_date(date);
        } else if let Some(command) = line.strip_prefix("Commandline:") {
            for package in install_targets(command) {
                events.push(InstallEvent {
                    package,
                    timestamp: started,
                    log_file: log_file.to_path_buf(),
                });
            }
        }
    }
}

fn parse_start_date(value: &str) -> Option<NaiveDateTime> {
    // apt pads the date and time with two spaces
    let value = value.split_whitespace().collect::<Vec<_>>().join(" ");
    match NaiveDateTime::parse_from_str(&value, START_DATE_FORMAT) {
        Ok(ts) => Some(ts),
        Err(e) => {
            trace!(value = %value, error = %e, "unparsable Start-Date");
            None
        }
    }
}

/// Packages named after the `install` subcommand of an apt command line.
///
/// Returns nothing when the command is not an install.
pub fn install_targets(command: &str) -> Vec<String> {
    let mut tokens = command.split_whitespace();
    if !tokens.any(|t| t == "install") {
        return Vec::new();
    }

    let mut targets = Vec::new();
    let mut skip_value = false;
    for token in tokens {
        if skip_value {
            skip_value = false;
            continue;
        }
        if token.starts_with('-') {
            skip_value = takes_separate_value(token);
            continue;
        }
        match install_target(token) {
            Some(name) => targets.push(name),
            None => trace!(token, "not a package name, skipped"),
        }
    }
    targets
}

/// Whether the option's value is the next token (`-t sid`, `-yt sid`).
fn takes_separate_value(option: &str) -> bool {
    if OPTIONS_WITH_VALUE.contains(&option) {
        return true;
    }
    // Bundled short flags: only the last one may take a value
    !option.starts_with("--")
        && !option.contains('=')
        && option.ends_with(['t', 'o', 'c'])
}

fn install_target(token: &str) -> Option<String> {
    if let Some(stem) = token.strip_suffix(".deb") {
        // ./pkg_1.0-1_amd64.deb
        let file_name = Path::new(stem).file_name()?.to_str()?;
        let name = file_name.split('_').next()?;
        return normalize_package_name(name);
    }
    // A trailing '-' asks apt to remove the package instead
    if token.ends_with('-') {
        return None;
    }
    let name = token.split_once('=').map_or(token, |(name, _version)| name);
    let name = name.split_once('/').map_or(name, |(name, _release)| name);
    normalize_package_name(name)
}
