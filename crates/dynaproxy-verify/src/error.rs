use core::result::Result as CoreResult;
use std::io::Error as IoError;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use toml::de::Error as TomlError;

/// Result type for harness operations.
pub type Result<T> = CoreResult<T, VerifyError>;

/// The verifier executable could not be located.
///
/// Cloneable so a failed resolution can be cached and replayed to every
/// later caller in the run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("verifier not found: {guidance}")]
pub struct ToolNotFound {
    /// Operator-facing hint on how to make the tool available.
    pub guidance: String,
}

impl ToolNotFound {
    /// Creates a new error with the given guidance.
    pub fn new<T: Into<String>>(guidance: T) -> Self {
        Self {
            guidance: guidance.into(),
        }
    }
}

/// Errors that can occur while verifying a generated module.
#[derive(Debug, Error)]
pub enum VerifyError {
    /// No usable verifier was found. Fatal to the whole run.
    #[error(transparent)]
    ToolNotFound(#[from] ToolNotFound),

    /// The verifier process could not be started.
    #[error("failed to launch verifier {}: {source}", .tool.display())]
    Launch {
        /// Tool that was being launched
        tool: PathBuf,
        /// Underlying spawn error
        source: IoError,
    },

    /// The verifier ran and rejected the module.
    #[error("verifier reported error(s) (exit code {exit_code}):\n{output}")]
    VerificationFailed {
        /// Exit code reported by the verifier
        exit_code: i32,
        /// Combined stdout and stderr text
        output: String,
    },

    /// The verifier did not finish before the configured deadline.
    #[error("verifier timed out after {timeout:?}; output so far:\n{output}")]
    Timeout {
        /// Deadline that was exceeded
        timeout: Duration,
        /// Combined output captured before the process was killed
        output: String,
    },

    /// The generation subsystem failed to persist its module.
    #[error("failed to save generated module: {0}")]
    SaveModule(#[source] IoError),

    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// Configuration is invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// TOML deserialization failed.
    #[error("TOML deserialization error: {0}")]
    Toml(#[from] TomlError),
}

impl VerifyError {
    /// Whether this error is a tooling problem rather than a defect in the
    /// generated module.
    pub fn is_tooling(&self) -> bool {
        !matches!(self, Self::VerificationFailed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::ErrorKind;

    #[test]
    fn test_verification_failed_message_carries_code_and_output() {
        let error = VerifyError::VerificationFailed {
            exit_code: 1,
            output: "Error: type load failure".to_owned(),
        };
        let message = error.to_string();
        assert!(message.contains("exit code 1"));
        assert!(message.contains("Error: type load failure"));
        assert!(!error.is_tooling());
    }

    #[test]
    fn test_tooling_errors() {
        let not_found = VerifyError::from(ToolNotFound::new("install peverify"));
        assert!(not_found.is_tooling());
        assert_eq!(not_found.to_string(), "verifier not found: install peverify");

        let launch = VerifyError::Launch {
            tool: PathBuf::from("peverify"),
            source: IoError::from(ErrorKind::NotFound),
        };
        assert!(launch.is_tooling());
        assert!(launch.to_string().contains("peverify"));

        let timeout = VerifyError::Timeout {
            timeout: Duration::from_millis(200),
            output: "started\n".to_owned(),
        };
        assert!(timeout.is_tooling());
        assert!(timeout.to_string().contains("200ms"));
    }
}
