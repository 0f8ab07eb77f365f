//! `RuffHost`, the explicitly constructed service that ties the supervisor,
//! the project scanner and the host commands together.
//!
//! Construction is initialization: [`RuffHost::start`] spawns the server and
//! wires the scanner to the binary it resolved. [`RuffHost::dispose`] tears
//! both down.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use ruff_host_config::{RuffSettings, global_ruff_config_path, persist_use_noqa};
use ruff_host_lsp::{DiagnosticsSnapshot, ServerSupervisor};
use ruff_host_scanner::{DiagnosticSink, ProjectScanner, ScanOutcome};
use ruff_host_types::Notice;

use crate::command::HostCommand;
use crate::report::{self, HostError};
use crate::workspace::Workspace;

/// Maximum number of supervisor events handled per pump.
const EVENT_BUDGET: usize = 64;

/// Upper bound on a restart; covers a hung shutdown plus a slow initialize.
const RESTART_TIMEOUT: Duration = Duration::from_secs(15);

/// Load host settings, falling back to defaults when the file is missing or broken.
#[must_use]
pub fn load_settings(config_path: Option<&Path>) -> RuffSettings {
    let Some(path) = config_path else {
        return RuffSettings::default();
    };
    match RuffSettings::load(path) {
        Ok(Some(settings)) => {
            tracing::info!(path = %path.display(), "Loaded ruff-host config");
            settings
        }
        // Read and parse failures are already logged by the loader.
        Ok(None) | Err(_) => RuffSettings::default(),
    }
}

pub struct RuffHost {
    settings: RuffSettings,
    config_path: Option<PathBuf>,
    global_config_path: Option<PathBuf>,
    workspace: Arc<dyn Workspace>,
    supervisor: ServerSupervisor,
    scanner: ProjectScanner,
    /// `BinaryNotFound` is surfaced once, the first time an action needs the binary.
    binary_not_found_reported: bool,
}

impl RuffHost {
    pub async fn start(
        settings: RuffSettings,
        config_path: Option<PathBuf>,
        workspace: Arc<dyn Workspace>,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Self {
        let scanner = ProjectScanner::new(settings.clone(), sink);
        Self::start_with_scanner(settings, config_path, workspace, scanner).await
    }

    /// Start with a caller-built scanner (e.g. one driven by a custom runner).
    pub async fn start_with_scanner(
        settings: RuffSettings,
        config_path: Option<PathBuf>,
        workspace: Arc<dyn Workspace>,
        scanner: ProjectScanner,
    ) -> Self {
        let mut supervisor = ServerSupervisor::new(settings.clone(), &workspace.project_roots());
        supervisor.start().await;
        scanner.set_executable_path(supervisor.binary().map(Path::to_path_buf));

        let mut host = Self {
            settings,
            config_path,
            global_config_path: global_ruff_config_path(),
            workspace,
            supervisor,
            scanner,
            binary_not_found_reported: false,
        };
        host.report_supervisor_errors();
        host
    }

    /// Override where `open-global-config` points.
    #[must_use]
    pub fn with_global_config_path(mut self, path: Option<PathBuf>) -> Self {
        self.global_config_path = path;
        self
    }

    #[must_use]
    pub fn settings(&self) -> &RuffSettings {
        &self.settings
    }

    #[must_use]
    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        self.supervisor.snapshot()
    }

    #[must_use]
    pub fn binary(&self) -> Option<&Path> {
        self.supervisor.binary()
    }

    pub async fn execute(&mut self, command: HostCommand) {
        tracing::info!(%command, "Executing command");
        let result = match command {
            HostCommand::RestartServer => {
                self.restart_server().await;
                Ok(())
            }
            HostCommand::LintProject => {
                self.lint_project().await;
                Ok(())
            }
            HostCommand::ToggleNoqa => self.toggle_noqa().await,
            HostCommand::OpenGlobalConfig => self.open_global_config(),
        };
        if let Err(e) = result {
            tracing::warn!(%command, "Command failed: {e}");
            self.workspace.notify(report::host_notice(&e));
        }
    }

    /// Restart the server without letting a hung shutdown block the caller.
    async fn restart_server(&mut self) {
        if tokio::time::timeout(RESTART_TIMEOUT, self.supervisor.restart())
            .await
            .is_err()
        {
            tracing::warn!("Language server restart timed out; continuing");
        }
        let binary = self.supervisor.binary().map(Path::to_path_buf);
        if binary.is_some() {
            self.binary_not_found_reported = false;
        }
        self.scanner.set_executable_path(binary);
        self.report_supervisor_errors();
    }

    async fn lint_project(&mut self) {
        if self.scanner.executable_path().is_none() {
            if !self.binary_not_found_reported {
                self.binary_not_found_reported = true;
                self.workspace.notify(report::binary_not_found_notice());
            }
            return;
        }

        let roots = self.workspace.project_roots();
        match self.scanner.run_scan(&roots).await {
            ScanOutcome::Completed { roots, findings } => {
                tracing::debug!(roots, findings, "Project lint finished");
            }
            ScanOutcome::AlreadyRunning => {
                tracing::debug!("Project lint already in progress");
            }
        }
    }

    async fn toggle_noqa(&mut self) -> Result<(), HostError> {
        let use_noqa = !self.settings.use_noqa();
        let path = self.config_path.clone().ok_or(HostError::NoConfigPath)?;
        persist_use_noqa(&path, use_noqa)?;

        self.settings.lint.use_noqa = Some(use_noqa);
        self.scanner.update_settings(self.settings.clone());
        self.supervisor.update_settings(self.settings.clone());
        self.restart_server().await;

        let title = if use_noqa {
            "noqa comments are respected"
        } else {
            "noqa comments are ignored"
        };
        self.workspace.notify(Notice::info(title));
        Ok(())
    }

    fn open_global_config(&self) -> Result<(), HostError> {
        let Some(path) = self.global_config_path.clone() else {
            tracing::warn!("No platform config directory; cannot locate ruff's global config");
            self.workspace.notify(
                Notice::warning("Cannot locate the global ruff config")
                    .with_detail("No platform config directory is available."),
            );
            return Ok(());
        };
        self.workspace
            .open_path(&path)
            .map_err(|source| HostError::Open { path, source })
    }

    /// Forward a saved or edited Python file to the server.
    pub async fn on_file_changed(&mut self, path: &Path, text: &str) {
        self.supervisor.on_file_changed(path, text).await;
        self.report_supervisor_errors();
    }

    /// Handle pending supervisor events. Never blocks.
    pub fn pump(&mut self) -> usize {
        let processed = self.supervisor.poll_events(EVENT_BUDGET);
        self.report_supervisor_errors();
        processed
    }

    fn report_supervisor_errors(&mut self) {
        for err in self.supervisor.take_errors() {
            match report::supervisor_notice(&err) {
                Some(notice) => {
                    tracing::warn!("Language server failure: {err}");
                    self.workspace.notify(notice);
                }
                None => tracing::debug!("Suppressed language server error: {err}"),
            }
        }
    }

    /// Release the sink and shut the server down.
    pub async fn dispose(mut self) {
        self.scanner.dispose();
        self.supervisor.shutdown().await;
        tracing::info!("Ruff host disposed");
    }
}
