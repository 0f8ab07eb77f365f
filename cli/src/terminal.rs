//! Terminal-backed [`Workspace`] and [`DiagnosticSink`].

use std::env;
use std::ffi::OsString;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

use ruff_host_engine::{DiagnosticSink, DisplayTarget, NormalizedDiagnostic, Notice, Workspace};

pub struct TerminalWorkspace {
    roots: Vec<PathBuf>,
}

impl TerminalWorkspace {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }
}

/// `$VISUAL`, then `$EDITOR`, ignoring empty values.
fn editor_from_env() -> Option<OsString> {
    ["VISUAL", "EDITOR"]
        .into_iter()
        .filter_map(env::var_os)
        .find(|value| !value.is_empty())
}

impl Workspace for TerminalWorkspace {
    fn project_roots(&self) -> Vec<PathBuf> {
        self.roots.clone()
    }

    fn open_path(&self, path: &Path) -> io::Result<()> {
        let Some(editor) = editor_from_env() else {
            println!("{}", path.display());
            return Ok(());
        };
        tracing::info!(path = %path.display(), "Launching editor");
        let status = Command::new(&editor).arg(path).status()?;
        if status.success() {
            Ok(())
        } else {
            Err(io::Error::other(format!(
                "{} exited with {status}",
                editor.to_string_lossy()
            )))
        }
    }

    fn notify(&self, notice: Notice) {
        eprintln!("{notice}");
    }
}

/// Prints every published set to stdout.
pub struct TerminalSink;

impl DiagnosticSink for TerminalSink {
    fn set_all_messages(&self, messages: Vec<NormalizedDiagnostic>, target: DisplayTarget) {
        let mut out = io::stdout().lock();
        for message in &messages {
            let _ = writeln!(out, "{}", message.display_line());
        }
        let _ = writeln!(out, "{}", summary_line(&messages, target));
    }

    fn clear_messages(&self) {}
}

fn summary_line(messages: &[NormalizedDiagnostic], target: DisplayTarget) -> String {
    let errors = messages.iter().filter(|m| m.severity().is_error()).count();
    let scope = match target {
        DisplayTarget::ProjectView => "project",
    };
    format!(
        "{scope}: {} finding(s), {errors} error(s)",
        messages.len()
    )
}

#[cfg(test)]
mod tests {
    use ruff_host_types::{Point, Range, Severity};

    use super::*;

    #[test]
    fn summary_counts_errors() {
        let make = |severity| {
            NormalizedDiagnostic::new(
                severity,
                "x".to_string(),
                PathBuf::from("a.py"),
                Range::at(Point::new(0, 0)),
            )
        };
        let messages = vec![make(Severity::Error), make(Severity::Warning)];
        assert_eq!(
            summary_line(&messages, DisplayTarget::ProjectView),
            "project: 2 finding(s), 1 error(s)"
        );
    }
}
