use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Sparse linter configuration.
///
/// Every field is optional. An absent field means "let ruff use its own
/// file-based configuration", so nothing is ever filled in with a default.
///
/// ```toml
/// executable_path = "/usr/local/bin/ruff"
/// line_length = 100
///
/// [lint]
/// select = ["E", "F"]
/// use_noqa = false
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RuffSettings {
    /// Path to the ruff binary. Host-only; never forwarded to ruff.
    pub executable_path: Option<PathBuf>,
    /// Path to a ruff config file (`--config`).
    pub configuration: Option<String>,
    pub line_length: Option<u32>,
    pub target_version: Option<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
    pub show_syntax_errors: Option<bool>,
    pub organize_imports: Option<bool>,
    pub fix_all: Option<bool>,
    #[serde(default)]
    pub lint: LintSettings,
    #[serde(default)]
    pub format: FormatSettings,
    #[serde(default)]
    pub code_action: CodeActionSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LintSettings {
    pub enable: Option<bool>,
    pub preview: Option<bool>,
    /// Whether `# noqa` comments are respected. `false` maps to ignore-noqa.
    pub use_noqa: Option<bool>,
    #[serde(default)]
    pub select: Vec<String>,
    #[serde(default)]
    pub ignore: Vec<String>,
    #[serde(default)]
    pub extend_select: Vec<String>,
    #[serde(default)]
    pub extend_ignore: Vec<String>,
    #[serde(default)]
    pub fixable: Vec<String>,
    #[serde(default)]
    pub unfixable: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FormatSettings {
    pub preview: Option<bool>,
    pub indent_style: Option<IndentStyle>,
    pub indent_width: Option<u32>,
    pub quote_style: Option<QuoteStyle>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CodeActionSettings {
    /// `codeAction.fixViolation.enable`
    pub fix_violation: Option<bool>,
    /// `codeAction.disableRuleComment.enable`
    pub disable_rule_comment: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndentStyle {
    Space,
    Tab,
}

impl IndentStyle {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Space => "space",
            Self::Tab => "tab",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteStyle {
    Double,
    Single,
    Preserve,
}

impl QuoteStyle {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Double => "double",
            Self::Single => "single",
            Self::Preserve => "preserve",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config at {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config at {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to edit config at {}", path.display())]
    Edit {
        path: PathBuf,
        #[source]
        source: toml_edit::TomlError,
    },
    #[error("failed to write config at {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. }
            | ConfigError::Parse { path, .. }
            | ConfigError::Edit { path, .. }
            | ConfigError::Write { path, .. } => path,
        }
    }
}

impl RuffSettings {
    /// Load settings from `path`.
    ///
    /// A missing file is `Ok(None)`; the caller falls back to defaults.
    pub fn load(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        match toml::from_str(&content) {
            Ok(settings) => Ok(Some(settings)),
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        }
    }

    /// Effective noqa handling: ruff respects `# noqa` unless told otherwise.
    #[must_use]
    pub fn use_noqa(&self) -> bool {
        self.lint.use_noqa.unwrap_or(true)
    }

    /// Effective syntax-error display toggle (shown unless disabled).
    #[must_use]
    pub fn show_syntax_errors(&self) -> bool {
        self.show_syntax_errors.unwrap_or(true)
    }
}
