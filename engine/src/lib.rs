//! Host integration for ruff: one service owning the language server and the
//! project-wide scanner, driven by zero-argument commands.

mod command;
mod host;
mod report;
mod workspace;

pub use command::{CommandSpec, HostCommand, UnknownCommand, command_help_summary, command_specs};
pub use host::{RuffHost, load_settings};
pub use report::HostError;
pub use workspace::Workspace;

pub use ruff_host_config::{RuffSettings, global_ruff_config_path, host_config_path};
pub use ruff_host_lsp::DiagnosticsSnapshot;
pub use ruff_host_scanner::{DiagnosticSink, DisplayTarget};
pub use ruff_host_types::{NormalizedDiagnostic, Notice, NoticeLevel};
