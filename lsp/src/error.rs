//! Typed errors for the server transport and supervisor.
//!
//! Classification happens where the error originates: the codec turns the
//! I/O errors a closing pipe produces into [`TransportError::StreamClosed`],
//! and reporting code asks [`SupervisorError::is_expected_during_shutdown`]
//! instead of inspecting message text.

use std::io;
use std::path::PathBuf;

use crate::types::ServerId;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The peer closed its end of the pipe. Routine during teardown.
    #[error("language server stream closed")]
    StreamClosed(#[source] io::Error),
    #[error("I/O error on language server stream")]
    Io(#[source] io::Error),
    #[error("malformed frame: {0}")]
    Malformed(String),
    #[error("Content-Length {len} exceeds maximum {max}")]
    Oversized { len: usize, max: usize },
    #[error("invalid JSON-RPC payload")]
    Json(#[from] serde_json::Error),
}

impl TransportError {
    /// Wrap an I/O error, tagging the kinds a closing pipe produces.
    #[must_use]
    pub fn from_io(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
            | io::ErrorKind::UnexpectedEof => Self::StreamClosed(err),
            _ => Self::Io(err),
        }
    }

    #[must_use]
    pub fn is_expected_during_shutdown(&self) -> bool {
        matches!(self, Self::StreamClosed(_))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    #[error("ruff executable not found")]
    BinaryNotFound { searched: Option<PathBuf> },
    #[error("failed to spawn {}", binary.display())]
    Spawn {
        binary: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("language server initialization failed: {0}")]
    Initialize(String),
    #[error("request '{method}' timed out")]
    RequestTimedOut { method: &'static str },
    #[error("language server channel closed")]
    ChannelClosed,
    /// The server died on its own with a non-zero exit code.
    #[error("{server} exited unexpectedly with code {code}")]
    Exited { server: ServerId, code: i32 },
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl SupervisorError {
    #[must_use]
    pub fn is_expected_during_shutdown(&self) -> bool {
        match self {
            Self::Transport(err) => err.is_expected_during_shutdown(),
            Self::ChannelClosed => true,
            _ => false,
        }
    }

    /// Whether this error means the binary itself is unavailable.
    #[must_use]
    pub fn is_binary_missing(&self) -> bool {
        match self {
            Self::BinaryNotFound { .. } => true,
            Self::Spawn { source, .. } => source.kind() == io::ErrorKind::NotFound,
            _ => false,
        }
    }
}
