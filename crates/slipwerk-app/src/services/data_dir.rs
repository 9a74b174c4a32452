// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Data directory and settings file location.

use std::path::{Path, PathBuf};

use slipwerk_core::config::CONFIG_FILE;

const APP_DIR: &str = "slipwerk";

/// Return the application data directory, creating it if needed.
pub fn data_dir() -> PathBuf {
    let base = resolve_base(
        std::env::var("XDG_DATA_HOME").ok(),
        std::env::var("HOME").ok(),
    );
    let dir = base.join(APP_DIR);
    if let Err(e) = std::fs::create_dir_all(&dir) {
        tracing::warn!(dir = %dir.display(), error = %e, "cannot create data directory");
    }
    dir
}

/// Settings file: the explicit path when given, else `settings.json` in the
/// data directory.
pub fn config_path(explicit: Option<&Path>) -> PathBuf {
    match explicit {
        Some(path) => path.to_path_buf(),
        None => data_dir().join(CONFIG_FILE),
    }
}

/// XDG data dir, then `~/.local/share`, then `/tmp`.
fn resolve_base(xdg: Option<String>, home: Option<String>) -> PathBuf {
    if let Some(xdg) = xdg.filter(|s| !s.is_empty()) {
        return PathBuf::from(xdg);
    }
    if let Some(home) = home.filter(|s| !s.is_empty()) {
        return PathBuf::from(home).join(".local").join("share");
    }
    PathBuf::from("/tmp")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_directory_precedence() {
        assert_eq!(
            resolve_base(Some("/xdg".into()), Some("/home/u".into())),
            PathBuf::from("/xdg")
        );
        assert_eq!(
            resolve_base(None, Some("/home/u".into())),
            PathBuf::from("/home/u/.local/share")
        );
        assert_eq!(resolve_base(Some(String::new()), None), PathBuf::from("/tmp"));
    }

    #[test]
    fn explicit_config_path_wins() {
        let path = Path::new("/etc/slipwerk/settings.json");
        assert_eq!(config_path(Some(path)), path.to_path_buf());
    }
}
