//! Shape of `ruff check --output-format=json` records.

use std::path::PathBuf;

use serde::Deserialize;

/// 1-based row/column as ruff prints them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RawLocation {
    pub row: u32,
    pub column: u32,
}

/// One record of the JSON array. Unknown fields (`fix`, `noqa_row`, ...) are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawFinding {
    pub filename: PathBuf,
    #[serde(default)]
    pub code: Option<String>,
    pub message: String,
    #[serde(default)]
    pub location: Option<RawLocation>,
    #[serde(default)]
    pub end_location: Option<RawLocation>,
    #[serde(default)]
    pub url: Option<String>,
}

/// Parse the whole stdout of one invocation.
pub fn parse_findings(stdout: &[u8]) -> Result<Vec<RawFinding>, serde_json::Error> {
    serde_json::from_slice(stdout)
}
