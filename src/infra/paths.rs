// src/infra/paths.rs — Config and data locations
//
// LIVETRACK_HOME overrides everything: config and the database both live under it.
// Otherwise config sits in ~/.livetrack/ and data in XDG_DATA_HOME/livetrack.

use directories::{BaseDirs, ProjectDirs};
use std::path::PathBuf;

/// Returns the LIVETRACK_HOME override, if set.
fn livetrack_home() -> Option<PathBuf> {
    std::env::var_os("LIVETRACK_HOME").map(PathBuf::from)
}

/// Configuration directory: $LIVETRACK_HOME/ or ~/.livetrack/
pub fn config_dir() -> PathBuf {
    if let Some(home) = livetrack_home() {
        return home;
    }
    match BaseDirs::new() {
        Some(base) => base.home_dir().join(".livetrack"),
        None => PathBuf::from(".livetrack"),
    }
}

/// Data directory: $LIVETRACK_HOME/data/ or ~/.local/share/livetrack/
pub fn data_dir() -> PathBuf {
    if let Some(home) = livetrack_home() {
        return home.join("data");
    }
    match ProjectDirs::from("", "", "livetrack") {
        Some(dirs) => dirs.data_local_dir().to_path_buf(),
        None => config_dir().join("data"),
    }
}

/// Default database path
pub fn db_path() -> PathBuf {
    data_dir().join("livetrack.db")
}

/// Config file path
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}
