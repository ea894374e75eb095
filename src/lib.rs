//! mypkgs library
//!
//! Works out which Debian packages were installed by hand, from apt's
//! extended_states, the apt history logs and the dpkg status database.

pub mod cli;
pub mod config;
pub mod error;
pub mod extended_states;
pub mod history;
pub mod reconcile;
pub mod stanza;
pub mod status;
pub mod types;

// Re-export main types for convenience
pub use config::SourcePaths;
pub use error::{MypkgsError, SourceFailure};
pub use extended_states::{parse_extended_states, read_extended_states};
pub use history::{discover_history_logs, parse_apt_history_logs, scan_history_logs, HistoryScan};
pub use reconcile::{PackageStateReconciler, Report};
pub use stanza::{parse_stanzas, Stanza, StanzaRule};
pub use status::{dpkg_status_auto, parse_dpkg_status, read_dpkg_status};
pub use types::{InstallEvent, ManualSet, PackageRecord, SourceKind};
