//! Host commands.
//!
//! Each command is a zero-argument trigger addressed by its kebab-case name.

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostCommand {
    RestartServer,
    LintProject,
    ToggleNoqa,
    OpenGlobalConfig,
}

#[derive(Debug, Clone, Copy)]
pub struct CommandSpec {
    pub command: HostCommand,
    pub name: &'static str,
    pub description: &'static str,
}

const COMMAND_SPECS: &[CommandSpec] = &[
    CommandSpec {
        command: HostCommand::RestartServer,
        name: "restart-server",
        description: "Restart the ruff language server",
    },
    CommandSpec {
        command: HostCommand::LintProject,
        name: "lint-project",
        description: "Run ruff check over every project root",
    },
    CommandSpec {
        command: HostCommand::ToggleNoqa,
        name: "toggle-noqa",
        description: "Toggle whether `# noqa` comments are respected",
    },
    CommandSpec {
        command: HostCommand::OpenGlobalConfig,
        name: "open-global-config",
        description: "Open the user-level ruff configuration",
    },
];

#[must_use]
pub fn command_specs() -> &'static [CommandSpec] {
    COMMAND_SPECS
}

#[must_use]
pub fn command_help_summary() -> String {
    let names: Vec<&str> = COMMAND_SPECS.iter().map(|spec| spec.name).collect();
    format!("Commands: {}", names.join(", "))
}

impl HostCommand {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::RestartServer => "restart-server",
            Self::LintProject => "lint-project",
            Self::ToggleNoqa => "toggle-noqa",
            Self::OpenGlobalConfig => "open-global-config",
        }
    }
}

impl fmt::Display for HostCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown command: {0}")]
pub struct UnknownCommand(pub String);

impl FromStr for HostCommand {
    type Err = UnknownCommand;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let name = raw.trim();
        COMMAND_SPECS
            .iter()
            .find(|spec| spec.name == name)
            .map(|spec| spec.command)
            .ok_or_else(|| UnknownCommand(name.to_string()))
    }
}
