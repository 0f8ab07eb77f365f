//! Project-wide `ruff check` scanning.

mod error;
mod finding;
mod process;
mod scanner;
mod sink;

pub use error::ScanError;
pub use finding::{RawFinding, RawLocation, parse_findings};
pub use process::{
    CHECK_TIMEOUT, CheckOutput, CheckRunner, MAX_STDOUT_BYTES, ProcessRunner, RunFut, check_args,
};
pub use scanner::{ProjectScanner, ScanOutcome, convert_message};
pub use sink::{DiagnosticSink, DisplayTarget};
