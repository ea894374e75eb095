use anyhow::Result;
use clap::{ArgAction, Parser};
use std::path::PathBuf;
use strum::{Display, EnumString};

use crate::config::SourcePaths;

/// mypkgs - list the Debian packages you installed by hand
#[derive(Parser, Debug)]
#[command(name = "mypkgs")]
#[command(about = "List manually installed Debian packages from dpkg state and apt history")]
#[command(version)]
pub struct Cli {
    /// More log output on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long)]
    pub quiet: bool,

    /// JSON file with source paths (extended_states, dpkg_status, history_dir)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Read the sources below this root instead of / (e.g. a mounted image)
    #[arg(long, value_name = "DIR", conflicts_with = "config")]
    pub root: Option<PathBuf>,

    /// Path to apt's extended_states file
    #[arg(long, value_name = "FILE")]
    pub extended_states: Option<PathBuf>,

    /// Path to the dpkg status database
    #[arg(long, value_name = "FILE")]
    pub status: Option<PathBuf>,

    /// Directory holding history.log and its rotated copies
    #[arg(long, value_name = "DIR")]
    pub history_dir: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value_t = OutputFormat::Plain)]
    pub format: OutputFormat,

    /// List install events from the apt history logs instead of package names
    #[arg(long)]
    pub history: bool,

    /// Print the effective source paths as JSON and exit
    #[arg(long, conflicts_with = "save_config")]
    pub dump_config: bool,

    /// Write the effective source paths to a JSON config file and exit
    #[arg(long, value_name = "FILE")]
    pub save_config: Option<PathBuf>,
}

/// How the package list is written to stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum OutputFormat {
    /// One package name per line
    #[default]
    Plain,
    /// A JSON array of names
    Json,
}

impl Cli {
    pub fn parse_args() -> Self {
        <Self as clap::Parser>::parse()
    }

    /// Effective source paths: `--root` or `--config` (or the system
    /// defaults), then the individual path flags on top.
    pub fn source_paths(&self) -> Result<SourcePaths> {
        let mut paths = match (&self.config, &self.root) {
            (Some(config), _) => SourcePaths::load_from_file(config)?,
            (None, Some(root)) => SourcePaths::under_root(root),
            (None, None) => SourcePaths::default(),
        };
        if let Some(path) = &self.extended_states {
            paths.extended_states = path.clone();
        }
        if let Some(path) = &self.status {
            paths.dpkg_status = path.clone();
        }
        if let Some(path) = &self.history_dir {
            paths.history_dir = path.clone();
        }
        paths.validate()?;
        Ok(paths)
    }

    /// Default log filter for the requested verbosity.
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_no_args() {
        let cli = Cli::try_parse_from(["mypkgs"]).unwrap();
        assert_eq!(cli.verbose, 0);
        assert_eq!(cli.format, OutputFormat::Plain);
        assert!(cli.config.is_none());
        assert_eq!(cli.log_level(), "warn");
    }

    #[test]
    fn test_cli_verbosity() {
        let cli = Cli::try_parse_from(["mypkgs", "-vv"]).unwrap();
        assert_eq!(cli.log_level(), "debug");

        let cli = Cli::try_parse_from(["mypkgs", "-vvvv"]).unwrap();
        assert_eq!(cli.log_level(), "trace");

        let cli = Cli::try_parse_from(["mypkgs", "--quiet"]).unwrap();
        assert_eq!(cli.log_level(), "error");
    }

    #[test]
    fn test_cli_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["mypkgs", "-q", "-v"]).is_err());
    }

    #[test]
    fn test_cli_path_overrides() {
        let cli = Cli::try_parse_from([
            "mypkgs",
            "--root",
            "/mnt",
            "--status",
            "/tmp/status",
            "--history-dir",
            "/tmp/apt",
        ])
        .unwrap();
        assert_eq!(cli.root, Some(PathBuf::from("/mnt")));
        assert_eq!(cli.status, Some(PathBuf::from("/tmp/status")));
        assert_eq!(cli.history_dir, Some(PathBuf::from("/tmp/apt")));
        assert!(cli.extended_states.is_none());
    }

    #[test]
    fn test_cli_root_conflicts_with_config() {
        assert!(Cli::try_parse_from(["mypkgs", "--root", "/mnt", "--config", "a.json"]).is_err());
    }

    #[test]
    fn test_source_paths_precedence() {
        let cli = Cli::try_parse_from(["mypkgs", "--root", "/mnt", "--status", "/tmp/status"])
            .unwrap();
        let paths = cli.source_paths().unwrap();
        assert_eq!(paths.extended_states, PathBuf::from("/mnt/var/lib/dpkg/extended_states"));
        assert_eq!(paths.dpkg_status, PathBuf::from("/tmp/status"));

        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("mypkgs.json");
        std::fs::write(&config, r#"{ "history_dir": "/srv/apt" }"#).unwrap();
        let cli = Cli::try_parse_from(["mypkgs", "--config", config.to_str().unwrap()]).unwrap();
        let paths = cli.source_paths().unwrap();
        assert_eq!(paths.history_dir, PathBuf::from("/srv/apt"));
        assert_eq!(paths.dpkg_status, PathBuf::from("/var/lib/dpkg/status"));
    }

    #[test]
    fn test_source_paths_missing_config_is_error() {
        let cli = Cli::try_parse_from(["mypkgs", "--config", "/nonexistent/mypkgs.json"]).unwrap();
        assert!(cli.source_paths().is_err());
    }

    #[test]
    fn test_cli_config_actions() {
        let cli = Cli::try_parse_from(["mypkgs", "--save-config", "out.json", "--history"]).unwrap();
        assert_eq!(cli.save_config, Some(PathBuf::from("out.json")));
        assert!(cli.history);
        assert!(
            Cli::try_parse_from(["mypkgs", "--dump-config", "--save-config", "out.json"]).is_err()
        );
    }

    #[test]
    fn test_cli_format() {
        let cli = Cli::try_parse_from(["mypkgs", "--format", "json"]).unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(Cli::try_parse_from(["mypkgs", "--format", "yaml"]).is_err());
    }
}
