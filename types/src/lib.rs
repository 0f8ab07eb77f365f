//! Core domain types for ruff-host.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Both the one-shot scanner and the language-server path produce the same
//! [`NormalizedDiagnostic`], so the host renders them identically.

mod diagnostic;
mod notice;

pub use diagnostic::{
    NormalizedDiagnostic, Point, Range, SYNTAX_ERROR_CODE, Severity, is_syntax_error_code,
    prefix_rule_code, rule_code_prefix,
};
pub use notice::{Notice, NoticeLevel};
