//! Platform path resolution.

use std::env;
use std::path::PathBuf;

/// Environment variable that overrides the host config file location.
pub const CONFIG_ENV_VAR: &str = "RUFF_HOST_CONFIG";

/// Location of the host config file.
///
/// `$RUFF_HOST_CONFIG` wins when set and non-empty; otherwise
/// `<config dir>/ruff-host/config.toml`.
#[must_use]
pub fn host_config_path() -> Option<PathBuf> {
    if let Ok(raw) = env::var(CONFIG_ENV_VAR)
        && !raw.trim().is_empty()
    {
        return Some(PathBuf::from(raw));
    }
    dirs::config_dir().map(|dir| dir.join("ruff-host").join("config.toml"))
}

/// Location of ruff's user-level configuration file.
///
/// Mirrors ruff's own lookup: the platform config directory
/// (`$XDG_CONFIG_HOME`, `~/Library/Application Support`, `%APPDATA%`)
/// followed by `ruff/pyproject.toml`.
#[must_use]
pub fn global_ruff_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("ruff").join("pyproject.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_config_path_ends_with_ruff_pyproject() {
        if let Some(path) = global_ruff_config_path() {
            assert!(path.ends_with("ruff/pyproject.toml"));
        }
    }
}
