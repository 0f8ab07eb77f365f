//! Locating the ruff executable.

use std::path::{Path, PathBuf};

use crate::error::SupervisorError;

const DEFAULT_BINARY: &str = "ruff";

/// Resolve the ruff binary.
///
/// A configured path is used when it points at an existing file; a configured
/// bare name (no path separators) is looked up on `PATH`. Without
/// configuration, `ruff` is looked up on `PATH`.
pub fn resolve_executable(configured: Option<&Path>) -> Result<PathBuf, SupervisorError> {
    let Some(configured) = configured.filter(|p| !p.as_os_str().is_empty()) else {
        return which::which(DEFAULT_BINARY)
            .map_err(|_| SupervisorError::BinaryNotFound { searched: None });
    };

    if configured.is_file() {
        return Ok(configured.to_path_buf());
    }

    let is_bare_name = configured.components().count() == 1 && !configured.is_absolute();
    if is_bare_name && let Ok(found) = which::which(configured) {
        return Ok(found);
    }

    Err(SupervisorError::BinaryNotFound {
        searched: Some(configured.to_path_buf()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_existing_file_is_used() {
        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("ruff");
        std::fs::write(&bin, "").unwrap();
        assert_eq!(resolve_executable(Some(&bin)).unwrap(), bin);
    }

    #[test]
    fn configured_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("missing").join("ruff");
        let err = resolve_executable(Some(&bin)).unwrap_err();
        assert!(err.is_binary_missing());
        assert!(matches!(
            err,
            SupervisorError::BinaryNotFound { searched: Some(p) } if p == bin
        ));
    }

    #[test]
    fn configured_directory_is_not_a_binary() {
        let dir = tempfile::tempdir().unwrap();
        assert!(resolve_executable(Some(dir.path())).is_err());
    }
}
