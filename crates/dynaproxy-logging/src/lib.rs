//! Level-filtered logging on top of `tracing`.
//!
//! Code that logs through the [`Logger`] trait stays independent of the
//! backend; [`TracingLogger`] forwards each call as a `tracing` event.
#![cfg_attr(
    test,
    allow(
        dead_code,
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::missing_panics_doc,
        clippy::missing_errors_doc,
        clippy::print_stdout,
        clippy::print_stderr,
        reason = "Allow for tests"
    )
)]

/// Errors attached to log messages.
mod exception;
/// Verbosity levels.
mod level;
/// The logger abstraction.
mod logger;
/// Adapter onto `tracing`.
mod tracing_logger;

pub use exception::{LogException, format_content};
pub use level::LoggerLevel;
pub use logger::Logger;
pub use tracing_logger::TracingLogger;
