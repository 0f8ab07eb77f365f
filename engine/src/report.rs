//! Turning failures into user-facing notices.
//!
//! Everything that might reach the user passes through here, so suppression
//! rules live in one place.

use std::io;
use std::path::PathBuf;

use ruff_host_config::ConfigError;
use ruff_host_lsp::SupervisorError;
use ruff_host_types::Notice;

pub(crate) const INSTALL_GUIDANCE: &str = "Install ruff (`pip install ruff` or `uv tool install ruff`) \
     or set `executable_path` in the ruff-host config.";

const SPAWN_REMEDIATION: &str =
    "Check that the file is an executable ruff binary, or clear `executable_path` to use ruff from PATH.";

#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("no ruff-host config file location is available")]
    NoConfigPath,
    #[error("failed to open {}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// The notice for a supervisor failure, or `None` when it should stay in the log.
pub(crate) fn supervisor_notice(err: &SupervisorError) -> Option<Notice> {
    if err.is_expected_during_shutdown() || err.is_binary_missing() {
        return None;
    }
    let notice = match err {
        SupervisorError::Spawn { binary, source } => {
            Notice::error("Failed to start the ruff language server").with_detail(format!(
                "{}: {source}. {SPAWN_REMEDIATION}",
                binary.display()
            ))
        }
        SupervisorError::Exited { code, .. } => {
            Notice::error("The ruff language server exited unexpectedly")
                .with_detail(format!("Exit code {code}. {INSTALL_GUIDANCE}"))
        }
        other => Notice::error("Ruff language server error").with_detail(other.to_string()),
    };
    Some(notice)
}

pub(crate) fn binary_not_found_notice() -> Notice {
    Notice::error("ruff executable not found").with_detail(INSTALL_GUIDANCE)
}

pub(crate) fn host_notice(err: &HostError) -> Notice {
    match err {
        HostError::Config(e) => {
            Notice::error("Failed to update the ruff-host config").with_detail(error_chain(e))
        }
        HostError::NoConfigPath => Notice::warning("Cannot save settings")
            .with_detail("No config directory is available; set RUFF_HOST_CONFIG."),
        HostError::Open { path, source } => Notice::warning("Failed to open file")
            .with_detail(format!("{}: {source}", path.display())),
    }
}

fn error_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        out.push_str(": ");
        out.push_str(&inner.to_string());
        source = inner.source();
    }
    out
}

#[cfg(test)]
mod tests {
    use ruff_host_lsp::TransportError;
    use ruff_host_types::NoticeLevel;

    use super::*;

    #[test]
    fn shutdown_noise_is_suppressed() {
        let closed = SupervisorError::from(TransportError::from_io(io::Error::from(
            io::ErrorKind::BrokenPipe,
        )));
        assert!(supervisor_notice(&closed).is_none());
        assert!(supervisor_notice(&SupervisorError::ChannelClosed).is_none());
    }

    #[test]
    fn missing_binary_is_suppressed() {
        let err = SupervisorError::BinaryNotFound { searched: None };
        assert!(supervisor_notice(&err).is_none());
        let err = SupervisorError::Spawn {
            binary: PathBuf::from("/opt/ruff"),
            source: io::Error::from(io::ErrorKind::NotFound),
        };
        assert!(supervisor_notice(&err).is_none());
    }

    #[test]
    fn spawn_failure_has_remediation() {
        let err = SupervisorError::Spawn {
            binary: PathBuf::from("/opt/ruff"),
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        };
        let notice = supervisor_notice(&err).unwrap();
        assert_eq!(notice.level(), NoticeLevel::Error);
        assert!(notice.detail().unwrap().contains("/opt/ruff"));
        assert!(notice.detail().unwrap().contains("executable_path"));
    }

    #[test]
    fn unexpected_transport_failure_is_reported() {
        let err = SupervisorError::from(TransportError::Malformed("missing header".to_string()));
        let notice = supervisor_notice(&err).unwrap();
        assert!(notice.detail().unwrap().contains("missing header"));
    }

    #[test]
    fn error_chain_joins_sources() {
        let err = HostError::Open {
            path: PathBuf::from("/x"),
            source: io::Error::other("denied"),
        };
        assert_eq!(error_chain(&err), "failed to open /x: denied");
    }
}
