use std::io;
use std::path::PathBuf;

/// Why one root contributed no findings.
///
/// These never escape [`crate::ProjectScanner::run_scan`]; they are logged and
/// the root is skipped.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("failed to spawn {}", binary.display())]
    Spawn {
        binary: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to capture {0} of ruff check")]
    StdioUnavailable(&'static str),
    #[error("failed waiting for ruff check")]
    Wait(#[source] io::Error),
    #[error("ruff check timed out after {secs}s")]
    TimedOut { secs: u64 },
    #[error("ruff check wrote to stderr: {0}")]
    Stderr(String),
    #[error("ruff check output is not valid JSON")]
    Parse(#[from] serde_json::Error),
}
