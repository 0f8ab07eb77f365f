//! Live diagnostics store: per-file diagnostics published by the server.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use ruff_host_types::NormalizedDiagnostic;

use crate::types::DiagnosticsSnapshot;

pub(crate) struct DiagnosticsStore {
    data: HashMap<PathBuf, Vec<NormalizedDiagnostic>>,
}

impl DiagnosticsStore {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
        }
    }

    /// Replace a file's diagnostics. An empty list clears the file.
    pub fn update(&mut self, path: PathBuf, items: Vec<NormalizedDiagnostic>) {
        if items.is_empty() {
            self.data.remove(&path);
        } else {
            self.data.insert(path, items);
        }
    }

    #[cfg(test)]
    pub fn get(&self, path: &Path) -> &[NormalizedDiagnostic] {
        self.data.get(path).map_or(&[][..], Vec::as_slice)
    }

    /// Drop everything, e.g. when the server that published it is gone.
    pub fn clear(&mut self) {
        self.data.clear();
    }

    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        let mut files: Vec<(PathBuf, Vec<NormalizedDiagnostic>)> = self
            .data
            .iter()
            .map(|(path, items)| (path.clone(), items.clone()))
            .collect();

        // Sort: files with errors first, then alphabetically
        files.sort_by(|a, b| {
            let a_has_errors = a.1.iter().any(|d| d.severity().is_error());
            let b_has_errors = b.1.iter().any(|d| d.severity().is_error());
            b_has_errors.cmp(&a_has_errors).then_with(|| a.0.cmp(&b.0))
        });

        DiagnosticsSnapshot::new(files)
    }
}
