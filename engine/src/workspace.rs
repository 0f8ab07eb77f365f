use std::io;
use std::path::{Path, PathBuf};

use ruff_host_types::Notice;

/// What the host needs from the editor around it.
pub trait Workspace: Send + Sync {
    /// Directories (or files) that make up the open project.
    fn project_roots(&self) -> Vec<PathBuf>;

    /// Show `path` to the user, creating nothing.
    fn open_path(&self, path: &Path) -> io::Result<()>;

    /// Surface a message to the user.
    fn notify(&self, notice: Notice);
}
