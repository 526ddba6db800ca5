//! Verification harness for dynamically generated proxy modules.
//!
//! Tests open a [`VerificationSession`] before generating code and end it
//! afterwards; ending the session saves the generated module and runs the
//! external bytecode verifier on it:
//! - [`ToolLocator`] finds the verifier once per process
//! - [`ProcessInvoker`] runs it and captures stdout and stderr concurrently
//! - [`evaluate`] turns the exit code into a [`Verdict`]
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

/// Harness configuration.
pub mod config;
/// Error types and result definitions.
mod error;
/// Contract with the code-generation subsystem.
mod generation;
/// Verifier subprocess execution.
mod invoker;
/// Verifier discovery.
mod locator;
/// Host platform detection.
mod platform;
/// Per-test lifecycle.
mod session;
/// Run classification.
mod verdict;
/// Entry point for test frameworks.
mod verifier;

pub use config::{HarnessConfig, VerifierConfig};
pub use error::{Result, ToolNotFound, VerifyError};
pub use generation::{GenerationSubsystem, ModuleBuilder, PersistentModuleBuilder};
pub use invoker::{
    ProcessInvoker, TextEncoding, VERBOSE_FLAG, VerificationRun, VerifierRunner,
    verifier_arguments,
};
pub use locator::{
    LocateStrategy, PROBED_FILE_NAME, ProbingDirectories, SEARCH_PATH_COMMAND, SearchPathProbe,
    ToolLocator, ToolPath,
};
pub use platform::{PLATFORM_ENV, PlatformVariant};
pub use session::VerificationSession;
pub use verdict::{SessionOutcome, Verdict, evaluate};
pub use verifier::Verifier;
