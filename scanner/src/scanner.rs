//! Project-wide lint scan.
//!
//! One `ruff check` per root, results aggregated and published to the sink as
//! a single replacement set. At most one scan runs at a time; overlapping
//! requests are dropped, not queued.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use ruff_host_config::{RuffSettings, translate};
use ruff_host_types::{
    NormalizedDiagnostic, Point, Range, Severity, is_syntax_error_code, prefix_rule_code,
};

use crate::error::ScanError;
use crate::finding::{RawFinding, parse_findings};
use crate::process::{CheckRunner, ProcessRunner, check_args, working_dir};
use crate::sink::{DiagnosticSink, DisplayTarget};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    /// The sink received a fresh set.
    Completed {
        /// Roots whose output was used.
        roots: usize,
        findings: usize,
    },
    /// Another scan was in flight; nothing happened.
    AlreadyRunning,
}

/// Clears the in-flight flag however the scan ends.
struct ScanGuard<'a>(&'a AtomicBool);

impl Drop for ScanGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct ProjectScanner {
    runner: Arc<dyn CheckRunner>,
    executable: Mutex<Option<PathBuf>>,
    settings: Mutex<RuffSettings>,
    sink: Mutex<Option<Arc<dyn DiagnosticSink>>>,
    scanning: AtomicBool,
}

impl ProjectScanner {
    #[must_use]
    pub fn new(settings: RuffSettings, sink: Arc<dyn DiagnosticSink>) -> Self {
        Self::with_runner(settings, sink, Arc::new(ProcessRunner::new()))
    }

    #[must_use]
    pub fn with_runner(
        settings: RuffSettings,
        sink: Arc<dyn DiagnosticSink>,
        runner: Arc<dyn CheckRunner>,
    ) -> Self {
        Self {
            runner,
            executable: Mutex::new(None),
            settings: Mutex::new(settings),
            sink: Mutex::new(Some(sink)),
            scanning: AtomicBool::new(false),
        }
    }

    pub fn set_executable_path(&self, path: Option<PathBuf>) {
        *self
            .executable
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = path;
    }

    #[must_use]
    pub fn executable_path(&self) -> Option<PathBuf> {
        self.executable
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn update_settings(&self, settings: RuffSettings) {
        *self.settings.lock().unwrap_or_else(PoisonError::into_inner) = settings;
    }

    #[must_use]
    pub fn is_scanning(&self) -> bool {
        self.scanning.load(Ordering::Acquire)
    }

    fn sink(&self) -> Option<Arc<dyn DiagnosticSink>> {
        self.sink
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Scan `roots` one after another and publish the combined findings.
    ///
    /// Never fails: a root that cannot be checked contributes nothing. Without
    /// an executable no process runs and an empty set is published.
    pub async fn run_scan(&self, roots: &[PathBuf]) -> ScanOutcome {
        if self
            .scanning
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("Project scan already running; ignoring request");
            return ScanOutcome::AlreadyRunning;
        }
        let _guard = ScanGuard(&self.scanning);

        let settings = self
            .settings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let flags = translate::cli_args(&settings);
        let show_syntax_errors = settings.show_syntax_errors();

        let mut messages = Vec::new();
        let mut scanned = 0;
        match self.executable_path() {
            Some(binary) => {
                for root in roots {
                    match self.scan_root(&binary, &flags, root).await {
                        Ok(findings) => {
                            let cwd = working_dir(root);
                            scanned += 1;
                            messages.extend(findings.iter().filter_map(|finding| {
                                convert_message(
                                    &cwd.join(&finding.filename),
                                    finding,
                                    show_syntax_errors,
                                )
                            }));
                        }
                        Err(e) => {
                            tracing::warn!(root = %root.display(), "Skipping root: {e}");
                        }
                    }
                }
            }
            None => {
                tracing::debug!("No ruff executable; publishing an empty project scan");
            }
        }

        let findings = messages.len();
        if let Some(sink) = self.sink() {
            sink.set_all_messages(messages, DisplayTarget::ProjectView);
        }
        tracing::info!(roots = scanned, count = findings, "Project scan finished");

        ScanOutcome::Completed {
            roots: scanned,
            findings,
        }
    }

    async fn scan_root(
        &self,
        binary: &Path,
        flags: &[String],
        root: &Path,
    ) -> Result<Vec<RawFinding>, ScanError> {
        let args = check_args(flags, root);
        let cwd = working_dir(root);
        tracing::debug!(root = %root.display(), ?args, "Running ruff check");

        let output = self.runner.run(binary, &args, &cwd).await?;
        if !output.stderr.is_empty() {
            return Err(ScanError::Stderr(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        if output.truncated_stdout {
            tracing::warn!(root = %root.display(), "ruff check output exceeded the size cap");
        }
        parse_findings(&output.stdout).map_err(ScanError::from)
    }

    pub fn clear_messages(&self) {
        if let Some(sink) = self.sink() {
            sink.clear_messages();
        }
    }

    /// Drop the sink; later scans still run but publish nowhere.
    pub fn dispose(&self) {
        self.sink
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}

/// Turn one finding into a diagnostic for `file_path`.
///
/// `None` when the finding has no location, or when it is a syntax error and
/// those are hidden. Coordinates move from 1-based to 0-based; a missing end
/// collapses to an empty range at the start.
#[must_use]
pub fn convert_message(
    file_path: &Path,
    finding: &RawFinding,
    show_syntax_errors: bool,
) -> Option<NormalizedDiagnostic> {
    let location = finding.location?;
    let is_syntax_error = is_syntax_error_code(finding.code.as_deref());
    if is_syntax_error && !show_syntax_errors {
        return None;
    }

    let start = Point::from_one_based(location.row, location.column);
    let end = finding
        .end_location
        .map_or(start, |end| Point::from_one_based(end.row, end.column));

    let severity = if is_syntax_error {
        Severity::Error
    } else {
        Severity::Warning
    };
    let excerpt = match finding.code.as_deref() {
        Some(code) => prefix_rule_code(code, &finding.message),
        None => finding.message.clone(),
    };

    Some(
        NormalizedDiagnostic::new(
            severity,
            excerpt,
            file_path.to_path_buf(),
            Range::new(start, end),
        )
        .with_url(finding.url.clone()),
    )
}
