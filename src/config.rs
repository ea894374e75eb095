//! Source path configuration.
//!
//! Every file the reconciler reads is a parameter rather than a hard-coded
//! path, so it can run against a mounted image (`--root /mnt`), a JSON config
//! file, or test fixtures.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::MypkgsError;

pub const DEFAULT_EXTENDED_STATES: &str = "/var/lib/dpkg/extended_states";
pub const DEFAULT_DPKG_STATUS: &str = "/var/lib/dpkg/status";
pub const DEFAULT_HISTORY_DIR: &str = "/var/log/apt";

/// Locations of the three package data sources
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcePaths {
    pub extended_states: PathBuf,
    pub dpkg_status: PathBuf,
    /// Directory holding `history.log` and its rotated generations
    pub history_dir: PathBuf,
}

impl Default for SourcePaths {
    fn default() -> Self {
        Self {
            extended_states: PathBuf::from(DEFAULT_EXTENDED_STATES),
            dpkg_status: PathBuf::from(DEFAULT_DPKG_STATUS),
            history_dir: PathBuf::from(DEFAULT_HISTORY_DIR),
        }
    }
}

impl SourcePaths {
    /// Default locations rebased under another filesystem root.
    pub fn under_root<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref();
        let rebase = |path: &str| root.join(path.trim_start_matches('/'));
        Self {
            extended_states: rebase(DEFAULT_EXTENDED_STATES),
            dpkg_status: rebase(DEFAULT_DPKG_STATUS),
            history_dir: rebase(DEFAULT_HISTORY_DIR),
        }
    }

    /// Pretty-printed JSON, the format `load_from_file` reads back
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize source paths")
    }

    /// Write the paths to a JSON config file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, self.to_json()? + "\n")
            .with_context(|| format!("Failed to write config {}", path.display()))
    }

    /// Read a JSON config file; absent fields keep their defaults
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        for (field, path) in [
            ("extended_states", &self.extended_states),
            ("dpkg_status", &self.dpkg_status),
            ("history_dir", &self.history_dir),
        ] {
            if path.as_os_str().is_empty() {
                let msg = format!("{} path must not be empty", field);
                return Err(MypkgsError::config(msg).into());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_system_paths() {
        let paths = SourcePaths::default();
        assert_eq!(paths.extended_states, Path::new("/var/lib/dpkg/extended_states"));
        assert_eq!(paths.dpkg_status, Path::new("/var/lib/dpkg/status"));
        assert_eq!(paths.history_dir, Path::new("/var/log/apt"));
        assert!(paths.validate().is_ok());
    }

    #[test]
    fn test_under_root() {
        let paths = SourcePaths::under_root("/mnt");
        assert_eq!(paths.dpkg_status, Path::new("/mnt/var/lib/dpkg/status"));
        assert_eq!(paths.history_dir, Path::new("/mnt/var/log/apt"));
        assert_eq!(SourcePaths::under_root("/"), SourcePaths::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("mypkgs.json");
        let paths = SourcePaths::under_root(dir.path());

        paths.save_to_file(&file).unwrap();
        let loaded = SourcePaths::load_from_file(&file).unwrap();
        assert_eq!(loaded, paths);
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("mypkgs.json");
        fs::write(&file, r#"{ "dpkg_status": "/srv/status" }"#).unwrap();

        let loaded = SourcePaths::load_from_file(&file).unwrap();
        assert_eq!(loaded.dpkg_status, Path::new("/srv/status"));
        assert_eq!(loaded.history_dir, Path::new(DEFAULT_HISTORY_DIR));
    }

    #[test]
    fn test_validate_rejects_empty_path() {
        let paths = SourcePaths {
            history_dir: PathBuf::new(),
            ..SourcePaths::default()
        };
        let err = paths.validate().unwrap_err();
        assert!(err.to_string().contains("history_dir"));
    }

    #[test]
    fn test_load_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("bad.json");
        fs::write(&file, "{ not json").unwrap();
        assert!(SourcePaths::load_from_file(&file).is_err());
    }
}
