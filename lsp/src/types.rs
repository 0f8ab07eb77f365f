//! Public types consumed by the engine.
//!
//! The engine reads [`DiagnosticsSnapshot`]s for the live-diagnostics view
//! and [`ExitKind`] tells it how a server ended.

use std::fmt;
use std::path::PathBuf;

use ruff_host_types::{NormalizedDiagnostic, Severity};

use crate::error::TransportError;

/// Identity of one spawned server process. Never reused within a supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServerId(pub(crate) u64);

impl fmt::Display for ServerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ruff#{}", self.0)
    }
}

/// How a server process ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitKind {
    /// We asked it to stop (shutdown, restart, dispose).
    Requested,
    /// Exit code 0 without being asked.
    Clean,
    /// Non-zero exit code without being asked.
    Failed { code: i32 },
    /// Terminated by a signal.
    Signaled,
    /// Waiting on the child failed; the outcome is unknown.
    Lost(String),
}

impl ExitKind {
    /// Classify an exit from its code (`None` means killed by a signal).
    #[must_use]
    pub fn classify(code: Option<i32>, requested: bool) -> Self {
        if requested {
            return Self::Requested;
        }
        match code {
            Some(0) => Self::Clean,
            Some(code) => Self::Failed { code },
            None => Self::Signaled,
        }
    }

    /// Only an unrequested non-zero exit deserves the user's attention.
    #[must_use]
    pub fn is_unexpected(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// An event emitted by server tasks to the supervisor.
#[derive(Debug)]
pub(crate) enum ServerEvent {
    /// Diagnostics updated for a file (already run through middleware).
    Diagnostics {
        path: PathBuf,
        items: Vec<NormalizedDiagnostic>,
    },
    /// The reader task stopped on a transport error.
    TransportFailed {
        server: ServerId,
        error: TransportError,
    },
    /// The child process is gone.
    Exited { server: ServerId, exit: ExitKind },
}

/// Immutable snapshot of live diagnostics, suitable for UI rendering.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticsSnapshot {
    /// Per-file diagnostics, sorted with error-containing files first.
    files: Vec<(PathBuf, Vec<NormalizedDiagnostic>)>,
}

impl DiagnosticsSnapshot {
    pub(crate) fn new(files: Vec<(PathBuf, Vec<NormalizedDiagnostic>)>) -> Self {
        Self { files }
    }

    #[must_use]
    pub fn files(&self) -> &[(PathBuf, Vec<NormalizedDiagnostic>)] {
        &self.files
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    fn count_by_severity(&self, severity: Severity) -> usize {
        self.files
            .iter()
            .flat_map(|(_, items)| items)
            .filter(|d| d.severity() == severity)
            .count()
    }

    #[must_use]
    pub fn error_count(&self) -> usize {
        self.count_by_severity(Severity::Error)
    }

    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.count_by_severity(Severity::Warning)
    }

    #[must_use]
    pub fn total_count(&self) -> usize {
        self.files.iter().map(|(_, items)| items.len()).sum()
    }

    /// Compact status string like "E:3 W:5".
    #[must_use]
    pub fn status_string(&self) -> String {
        if self.is_empty() {
            return String::new();
        }
        format!("E:{} W:{}", self.error_count(), self.warning_count())
    }
}
