use ruff_host_types::NormalizedDiagnostic;

/// Where a published message set should be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisplayTarget {
    /// Project-wide results, as opposed to the current file.
    ProjectView,
}

/// Receives the scanner's results. Each publish replaces the previous set.
pub trait DiagnosticSink: Send + Sync {
    fn set_all_messages(&self, messages: Vec<NormalizedDiagnostic>, target: DisplayTarget);
    fn clear_messages(&self);
}
