//! Entry point tying platform, verifier runner and sessions together.

use crate::config::HarnessConfig;
use crate::error::Result;
use crate::generation::GenerationSubsystem;
use crate::invoker::{ProcessInvoker, VerifierRunner};
use crate::locator::ToolLocator;
use crate::platform::PlatformVariant;
use crate::session::VerificationSession;
use crate::verdict::{SessionOutcome, Verdict, evaluate};
use std::path::Path;
use std::sync::Arc;

/// Verifies generated modules for one platform.
#[derive(Clone)]
pub struct Verifier {
    platform: PlatformVariant,
    runner: Arc<dyn VerifierRunner>,
}

impl Verifier {
    /// Verifier using an explicit platform and runner.
    pub fn new(platform: PlatformVariant, runner: Arc<dyn VerifierRunner>) -> Self {
        Self { platform, runner }
    }

    /// Verifier for the current host, running the real tool found through
    /// the process-wide locator.
    pub fn from_config(config: &HarnessConfig) -> Self {
        let platform = PlatformVariant::current();
        let locator = ToolLocator::global(platform, config);
        Self::new(
            platform,
            Arc::new(ProcessInvoker::from_config(locator, &config.verifier)),
        )
    }

    /// Platform verdicts are evaluated for.
    pub fn platform(&self) -> PlatformVariant {
        self.platform
    }

    /// Starts a session for one test.
    pub fn begin<'s, G, T>(&'s self, subsystem: &'s G, name: T) -> VerificationSession<'s, G>
    where
        G: GenerationSubsystem,
        T: Into<String>,
    {
        VerificationSession::begin(self, subsystem, name)
    }

    /// Runs `body` inside a session and verifies whatever it generated.
    ///
    /// # Errors
    /// Returns the error from [`VerificationSession::end`].
    pub fn run_test<'s, G, F, T>(
        &'s self,
        subsystem: &'s G,
        name: &str,
        body: F,
    ) -> Result<(T, SessionOutcome)>
    where
        G: GenerationSubsystem,
        F: FnOnce(&mut VerificationSession<'s, G>) -> T,
    {
        let mut session = self.begin(subsystem, name);
        let value = body(&mut session);
        let outcome = session.end()?;
        Ok((value, outcome))
    }

    /// Verifies one module on disk.
    ///
    /// # Errors
    /// Returns `VerifyError::VerificationFailed` when the module is rejected on
    /// the Reference platform, or the runner's error if it could not run.
    pub fn verify_module(&self, path: &Path, name: &str) -> Result<SessionOutcome> {
        let run = self.runner.run(path, self.platform)?;
        tracing::info!(exit_code = run.exit_code, "{name}: {} code", run.exit_code);

        let verdict = evaluate(&run, self.platform);
        match &verdict {
            Verdict::Passed => {}
            Verdict::Exempted { exit_code, output } => tracing::warn!(
                exit_code,
                "{name}: verifier exited with code {exit_code} on the {} platform, not failing\n{output}",
                self.platform
            ),
            Verdict::Failed { output, .. } => {
                tracing::error!("{name}: verifier reported error(s)\n{output}");
            }
        }
        verdict.into_outcome()
    }
}
