//! `ServerSupervisor`: public API consumed by the engine.
//!
//! Owns the lifecycle of the `ruff server` process: binary resolution,
//! spawning, exit classification, bounded shutdown and restart. Running
//! servers live in the `servers` map; an exit event removes them.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ruff_host_config::RuffSettings;
use tokio::sync::mpsc;

use crate::binary::resolve_executable;
use crate::diagnostics::DiagnosticsStore;
use crate::error::SupervisorError;
use crate::middleware::MiddlewareChain;
use crate::protocol;
use crate::server::RunningServer;
use crate::types::{DiagnosticsSnapshot, ExitKind, ServerEvent, ServerId};

/// Directories standing for `roots`, deduplicated, in order. Never empty.
fn workspace_dirs(roots: &[PathBuf]) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = Vec::with_capacity(roots.len());
    for root in roots {
        let dir = if root.is_file() {
            root.parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
        } else {
            root.clone()
        };
        if !dirs.contains(&dir) {
            dirs.push(dir);
        }
    }
    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }
    dirs
}

/// Channel capacity for the event channel between server tasks and the supervisor.
const EVENT_CHANNEL_CAPACITY: usize = 256;

const PYTHON_EXTENSIONS: &[&str] = &["py", "pyi"];

pub struct ServerSupervisor {
    settings: Arc<RuffSettings>,
    /// Directories served as workspace folders; the first is the working directory.
    workspace_roots: Vec<PathBuf>,
    /// Binary resolved by the most recent start.
    binary: Option<PathBuf>,
    /// Set when resolution or spawning found no binary; keeps spawn errors quiet.
    binary_missing: bool,
    servers: HashMap<ServerId, RunningServer>,
    next_server: u64,
    diagnostics: DiagnosticsStore,
    event_rx: mpsc::Receiver<ServerEvent>,
    event_tx: mpsc::Sender<ServerEvent>,
    middleware: MiddlewareChain,
    /// Failures awaiting the engine's reporting pass.
    errors: Vec<SupervisorError>,
}

impl ServerSupervisor {
    /// `project_roots` may mix directories and files; a file root is served
    /// through its parent directory.
    #[must_use]
    pub fn new(settings: RuffSettings, project_roots: &[PathBuf]) -> Self {
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            settings: Arc::new(settings),
            workspace_roots: workspace_dirs(project_roots),
            binary: None,
            binary_missing: false,
            servers: HashMap::new(),
            next_server: 1,
            diagnostics: DiagnosticsStore::new(),
            event_rx,
            event_tx,
            middleware: MiddlewareChain::standard(),
            errors: Vec::new(),
        }
    }

    /// Replace the diagnostics middleware used by servers started from now on.
    #[must_use]
    pub fn with_middleware(mut self, middleware: MiddlewareChain) -> Self {
        self.middleware = middleware;
        self
    }

    /// Resolve the binary and spawn a server.
    ///
    /// Returns `None` when nothing was started. A missing binary is silent;
    /// any other failure is queued for [`Self::take_errors`].
    pub async fn start(&mut self) -> Option<ServerId> {
        let binary = match resolve_executable(self.settings.executable_path.as_deref()) {
            Ok(binary) => binary,
            Err(e) => {
                tracing::info!("Not starting language server: {e}");
                self.binary = None;
                self.binary_missing = true;
                return None;
            }
        };
        self.binary = Some(binary.clone());
        self.binary_missing = false;

        let id = ServerId(self.next_server);
        self.next_server += 1;

        tracing::info!(server = %id, binary = %binary.display(), "Starting language server");
        match RunningServer::start(
            id,
            &binary,
            self.settings.clone(),
            &self.workspace_roots,
            self.event_tx.clone(),
            self.middleware.clone(),
        )
        .await
        {
            Ok(handle) => {
                tracing::info!(server = %id, "Language server started");
                self.servers.insert(id, handle);
                Some(id)
            }
            Err(e) => {
                if e.is_binary_missing() {
                    self.binary_missing = true;
                }
                tracing::warn!(server = %id, "Failed to start language server: {e}");
                self.errors.push(e);
                None
            }
        }
    }

    /// Shut every server down, then start again with a freshly resolved binary.
    pub async fn restart(&mut self) -> Option<ServerId> {
        self.shutdown().await;
        self.diagnostics.clear();
        self.start().await
    }

    /// Gracefully shut down all servers. Each one is bounded by the shutdown deadline.
    pub async fn shutdown(&mut self) {
        let servers = std::mem::take(&mut self.servers);
        for (id, server) in servers {
            tracing::info!(server = %id, "Shutting down language server");
            server.shutdown().await;
        }
    }

    /// Settings take effect at the next start.
    pub fn update_settings(&mut self, settings: RuffSettings) {
        self.settings = Arc::new(settings);
    }

    /// Forward a Python file's contents to the running servers.
    pub async fn on_file_changed(&mut self, path: &Path, text: &str) {
        let is_python = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| PYTHON_EXTENSIONS.contains(&ext));
        if !is_python || self.servers.is_empty() {
            return;
        }

        let uri = match protocol::path_to_file_uri(path) {
            Ok(u) => u.to_string(),
            Err(e) => {
                tracing::warn!("Skipping file notification: {e}");
                return;
            }
        };

        for (id, server) in &mut self.servers {
            if let Err(e) = server.notify_file_changed(&uri, text).await {
                tracing::warn!(server = %id, "Failed to notify about {}: {e}", path.display());
                self.errors.push(e);
            }
        }
    }

    /// Drain pending events from server tasks, up to `budget`. Never blocks.
    pub fn poll_events(&mut self, budget: usize) -> usize {
        let mut count = 0;
        while count < budget {
            match self.event_rx.try_recv() {
                Ok(event) => {
                    self.handle_event(event);
                    count += 1;
                }
                Err(mpsc::error::TryRecvError::Empty | mpsc::error::TryRecvError::Disconnected) => {
                    break;
                }
            }
        }
        count
    }

    fn handle_event(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::Diagnostics { path, items } => {
                tracing::debug!(
                    path = %path.display(),
                    count = items.len(),
                    "Diagnostics updated"
                );
                self.diagnostics.update(path, items);
            }
            ServerEvent::TransportFailed { server, error } => {
                if error.is_expected_during_shutdown() {
                    tracing::debug!(server = %server, "Transport closed: {error}");
                } else {
                    tracing::warn!(server = %server, "Transport failed: {error}");
                }
                self.errors.push(SupervisorError::Transport(error));
            }
            ServerEvent::Exited { server, exit } => {
                self.servers.remove(&server);
                match &exit {
                    ExitKind::Failed { code } => {
                        tracing::warn!(server = %server, code, "Language server exited unexpectedly");
                        self.errors.push(SupervisorError::Exited { server, code: *code });
                    }
                    ExitKind::Lost(reason) => {
                        tracing::warn!(server = %server, "Lost track of language server: {reason}");
                    }
                    ExitKind::Requested | ExitKind::Clean | ExitKind::Signaled => {
                        tracing::info!(server = %server, ?exit, "Language server exited");
                    }
                }
                if self.servers.is_empty() {
                    self.diagnostics.clear();
                }
            }
        }
    }

    /// Take the failures queued since the last call.
    pub fn take_errors(&mut self) -> Vec<SupervisorError> {
        std::mem::take(&mut self.errors)
    }

    #[must_use]
    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        self.diagnostics.snapshot()
    }

    #[must_use]
    pub fn binary(&self) -> Option<&Path> {
        self.binary.as_deref()
    }

    #[must_use]
    pub fn binary_missing(&self) -> bool {
        self.binary_missing
    }

    #[must_use]
    pub fn has_running_servers(&self) -> bool {
        !self.servers.is_empty()
    }

    #[must_use]
    pub fn settings(&self) -> &RuffSettings {
        &self.settings
    }

    #[cfg(test)]
    pub(crate) fn event_tx(&self) -> &mpsc::Sender<ServerEvent> {
        &self.event_tx
    }
}
