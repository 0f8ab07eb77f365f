//! Normalized diagnostics shared by the scanner and the language-server path.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Rule code ruff uses for syntax errors in older releases.
///
/// Newer releases report syntax errors with a `null` code instead.
pub const SYNTAX_ERROR_CODE: &str = "E999";

/// Separator placed between a rule code and its message.
const CODE_SEPARATOR: &str = " — ";

/// Severity level for a diagnostic as the host displays it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    /// Convert from LSP numeric severity (1=Error, 2=Warning, 3=Info, 4=Hint).
    ///
    /// Hints are folded into `Info`; the host has no separate hint level.
    /// Returns `None` for values outside the LSP-defined range.
    #[must_use]
    pub fn from_lsp(value: u64) -> Option<Self> {
        match value {
            1 => Some(Self::Error),
            2 => Some(Self::Warning),
            3 | 4 => Some(Self::Info),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_error(self) -> bool {
        self == Self::Error
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Zero-based `(row, column)` pair. Serialized as `[row, column]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "[u32; 2]", from = "[u32; 2]")]
pub struct Point {
    pub row: u32,
    pub column: u32,
}

impl Point {
    #[must_use]
    pub const fn new(row: u32, column: u32) -> Self {
        Self { row, column }
    }

    /// Convert 1-based coordinates (as ruff reports them) to 0-based.
    ///
    /// Saturates at zero so a malformed `0` never underflows.
    #[must_use]
    pub const fn from_one_based(row: u32, column: u32) -> Self {
        Self {
            row: row.saturating_sub(1),
            column: column.saturating_sub(1),
        }
    }
}

impl From<Point> for [u32; 2] {
    fn from(point: Point) -> Self {
        [point.row, point.column]
    }
}

impl From<[u32; 2]> for Point {
    fn from([row, column]: [u32; 2]) -> Self {
        Self { row, column }
    }
}

/// Zero-based half-open range. Serialized as `[[startRow, startCol], [endRow, endCol]]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "[Point; 2]", from = "[Point; 2]")]
pub struct Range {
    pub start: Point,
    pub end: Point,
}

impl Range {
    #[must_use]
    pub const fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    /// An empty range anchored at `point`.
    #[must_use]
    pub const fn at(point: Point) -> Self {
        Self {
            start: point,
            end: point,
        }
    }
}

impl From<Range> for [Point; 2] {
    fn from(range: Range) -> Self {
        [range.start, range.end]
    }
}

impl From<[Point; 2]> for Range {
    fn from([start, end]: [Point; 2]) -> Self {
        Self { start, end }
    }
}

/// Whether a rule code marks a syntax error rather than a lint violation.
#[must_use]
pub fn is_syntax_error_code(code: Option<&str>) -> bool {
    match code {
        None => true,
        Some(code) => code == SYNTAX_ERROR_CODE,
    }
}

/// The prefix `code` contributes to a display message, e.g. `"E501 — "`.
#[must_use]
pub fn rule_code_prefix(code: &str) -> String {
    format!("{code}{CODE_SEPARATOR}")
}

/// Prefix `message` with its rule code, unless it already carries that prefix.
///
/// Applying this twice yields the same string as applying it once.
#[must_use]
pub fn prefix_rule_code(code: &str, message: &str) -> String {
    let prefix = rule_code_prefix(code);
    if message.starts_with(&prefix) {
        message.to_string()
    } else {
        format!("{prefix}{message}")
    }
}

/// A diagnostic ready for display in the host.
///
/// Fields are private; construction goes through [`NormalizedDiagnostic::new`]
/// and consumers read via accessors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedDiagnostic {
    severity: Severity,
    excerpt: String,
    location: Location,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Location {
    file: PathBuf,
    position: Range,
}

impl NormalizedDiagnostic {
    #[must_use]
    pub fn new(severity: Severity, excerpt: String, file: PathBuf, position: Range) -> Self {
        Self {
            severity,
            excerpt,
            location: Location { file, position },
            url: None,
        }
    }

    /// Attach the rule documentation link.
    #[must_use]
    pub fn with_url(mut self, url: Option<String>) -> Self {
        self.url = url;
        self
    }

    #[must_use]
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Display text: `"<code> — <message>"` or the bare message.
    #[must_use]
    pub fn excerpt(&self) -> &str {
        &self.excerpt
    }

    #[must_use]
    pub fn file(&self) -> &Path {
        &self.location.file
    }

    /// Zero-based half-open range.
    #[must_use]
    pub fn position(&self) -> Range {
        self.location.position
    }

    #[must_use]
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Format as `path:row:col: severity: excerpt` (1-indexed for display).
    #[must_use]
    pub fn display_line(&self) -> String {
        let start = self.location.position.start;
        format!(
            "{}:{}:{}: {}: {}",
            self.location.file.display(),
            start.row + 1,
            start.column + 1,
            self.severity,
            self.excerpt,
        )
    }
}
