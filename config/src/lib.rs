//! Configuration for ruff-host.
//!
//! [`RuffSettings`] is the single sparse configuration shape. It is loaded from
//! the host config file, translated into server settings and CLI flags by
//! [`translate`], and selectively persisted back with `toml_edit`.

mod paths;
mod persist;
mod settings;
pub mod translate;

pub use paths::{CONFIG_ENV_VAR, global_ruff_config_path, host_config_path};
pub use persist::persist_use_noqa;
pub use settings::{
    CodeActionSettings, ConfigError, FormatSettings, IndentStyle, LintSettings, QuoteStyle,
    RuffSettings,
};
