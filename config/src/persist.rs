//! In-place updates to the host config file.
//!
//! Uses `toml_edit` so comments and layout survive, and a temp file + rename
//! so a crash never leaves a half-written config behind.

use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::settings::ConfigError;

/// Persist `lint.use_noqa = value` to the config file at `path`.
///
/// Creates the file and its parent directory if they don't exist.
pub fn persist_use_noqa(path: &Path, value: bool) -> Result<(), ConfigError> {
    let write_err = |source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(write_err)?;
    }

    let content = if path.exists() {
        fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?
    } else {
        String::new()
    };

    let mut doc = content
        .parse::<toml_edit::DocumentMut>()
        .map_err(|source| ConfigError::Edit {
            path: path.to_path_buf(),
            source,
        })?;

    if !doc.contains_key("lint") {
        doc["lint"] = toml_edit::Item::Table(toml_edit::Table::new());
    }
    doc["lint"]["use_noqa"] = toml_edit::value(value);

    atomic_write(path, doc.to_string().as_bytes()).map_err(write_err)?;
    tracing::debug!(path = %path.display(), use_noqa = value, "Persisted noqa setting");
    Ok(())
}

fn atomic_write(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::RuffSettings;

    #[test]
    fn creates_file_with_lint_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        persist_use_noqa(&path, false).unwrap();

        let settings = RuffSettings::load(&path).unwrap().unwrap();
        assert_eq!(settings.lint.use_noqa, Some(false));
    }

    #[test]
    fn preserves_comments_and_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "# my settings\nline_length = 100\n\n[lint]\n# keep this\nselect = [\"E\"]\n",
        )
        .unwrap();

        persist_use_noqa(&path, false).unwrap();
        persist_use_noqa(&path, true).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("# my settings"));
        assert!(content.contains("# keep this"));

        let settings = RuffSettings::load(&path).unwrap().unwrap();
        assert_eq!(settings.line_length, Some(100));
        assert_eq!(settings.lint.select, vec!["E"]);
        assert_eq!(settings.lint.use_noqa, Some(true));
    }

    #[test]
    fn rejects_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[lint\nbroken").unwrap();

        let err = persist_use_noqa(&path, false).unwrap_err();
        assert!(matches!(err, ConfigError::Edit { .. }));
    }
}
