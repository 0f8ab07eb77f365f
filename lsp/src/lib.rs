//! Supervisor for the `ruff server` language server process.

pub mod codec;
pub mod middleware;
pub mod types;

pub(crate) mod diagnostics;
pub(crate) mod protocol;
pub(crate) mod server;

mod binary;
mod error;
mod supervisor;

pub use binary::resolve_executable;
pub use error::{SupervisorError, TransportError};
pub use middleware::{DiagnosticsMiddleware, MiddlewareChain, RuleCodePrefix};
pub use protocol::{LspDiagnostic, LspPosition, LspRange, PublishDiagnosticsParams};
pub use supervisor::ServerSupervisor;
pub use types::{DiagnosticsSnapshot, ExitKind, ServerId};
