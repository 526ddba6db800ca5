//! Classification of verifier runs.

use crate::error::{Result, VerifyError};
use crate::invoker::VerificationRun;
use crate::platform::PlatformVariant;

/// Outcome of a single verifier run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The verifier accepted the module.
    Passed,
    /// The verifier rejected the module.
    Failed {
        /// Exit code reported by the verifier
        exit_code: i32,
        /// Combined verifier output
        output: String,
    },
    /// The verifier rejected the module on a platform whose verifier is known
    /// to reject valid constructs.
    Exempted {
        /// Exit code reported by the verifier
        exit_code: i32,
        /// Combined verifier output
        output: String,
    },
}

/// Successful results of ending a verification session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The test disabled verification.
    VerificationDisabled,
    /// Nothing was generated, so nothing was verified.
    NoArtifact,
    /// The verifier accepted the module.
    Passed,
    /// The verifier's rejection was exempted.
    Exempted {
        /// Exit code reported by the verifier
        exit_code: i32,
    },
}

/// Classifies a run.
pub fn evaluate(run: &VerificationRun, platform: PlatformVariant) -> Verdict {
    if run.exit_code == 0 {
        return Verdict::Passed;
    }

    match platform {
        PlatformVariant::Alternate => Verdict::Exempted {
            exit_code: run.exit_code,
            output: run.output.clone(),
        },
        PlatformVariant::Reference => Verdict::Failed {
            exit_code: run.exit_code,
            output: run.output.clone(),
        },
    }
}

impl Verdict {
    /// Whether the module counts as verified.
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }

    /// Converts to a session result, turning `Failed` into an error.
    ///
    /// # Errors
    /// Returns `VerifyError::VerificationFailed` with the full output for a
    /// failed verdict.
    pub fn into_outcome(self) -> Result<SessionOutcome> {
        match self {
            Self::Passed => Ok(SessionOutcome::Passed),
            Self::Exempted { exit_code, .. } => Ok(SessionOutcome::Exempted { exit_code }),
            Self::Failed { exit_code, output } => {
                Err(VerifyError::VerificationFailed { exit_code, output })
            }
        }
    }
}
