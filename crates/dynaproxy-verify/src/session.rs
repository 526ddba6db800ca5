//! Per-test generation and verification lifecycle.

use crate::error::{Result, VerifyError};
use crate::generation::{GenerationSubsystem, ModuleBuilder};
use crate::verdict::SessionOutcome;
use crate::verifier::Verifier;

/// State owned by one test between `begin` and `end`.
///
/// Consumed by [`VerificationSession::end`], so a session can never be
/// reused by a second test.
pub struct VerificationSession<'s, G: GenerationSubsystem> {
    verifier: &'s Verifier,
    subsystem: &'s G,
    name: String,
    builder: G::Builder,
    generator: G::Generator,
    verification_disabled: bool,
}

impl<'s, G: GenerationSubsystem> VerificationSession<'s, G> {
    /// Starts a session with a freshly created builder and generator.
    pub fn begin<T: Into<String>>(verifier: &'s Verifier, subsystem: &'s G, name: T) -> Self {
        let (builder, generator) = subsystem.create();
        let name = name.into();
        tracing::trace!("Begin verification session {name}");
        Self {
            verifier,
            subsystem,
            name,
            builder,
            generator,
            verification_disabled: false,
        }
    }

    /// Throws away the current builder and generator and creates new ones.
    pub fn reset_generator_and_builder(&mut self) {
        let (builder, generator) = self.subsystem.create();
        self.builder = builder;
        self.generator = generator;
    }

    /// Skips verification when this session ends.
    pub fn disable_verification(&mut self) {
        self.verification_disabled = true;
    }

    /// Whether [`disable_verification`](Self::disable_verification) was called.
    pub fn is_verification_disabled(&self) -> bool {
        self.verification_disabled
    }

    /// Name used in log lines.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The builder that receives generated modules.
    pub fn builder(&self) -> &G::Builder {
        &self.builder
    }

    /// Mutable access to the builder.
    pub fn builder_mut(&mut self) -> &mut G::Builder {
        &mut self.builder
    }

    /// The generator for the test body.
    pub fn generator(&self) -> &G::Generator {
        &self.generator
    }

    /// Mutable access to the generator.
    pub fn generator_mut(&mut self) -> &mut G::Generator {
        &mut self.generator
    }

    /// Ends the session, verifying the generated module unless verification
    /// was disabled or nothing was generated.
    ///
    /// # Errors
    /// Returns `VerifyError::VerificationFailed` when the verifier rejects the
    /// module, or a tooling error if the module cannot be saved or the
    /// verifier cannot be run.
    pub fn end(mut self) -> Result<SessionOutcome> {
        if self.verification_disabled {
            tracing::debug!("{}: verification disabled", self.name);
            return Ok(SessionOutcome::VerificationDisabled);
        }

        // The builder only keeps its most recent module.
        let Some(path) = self
            .builder
            .save_module()
            .map_err(VerifyError::SaveModule)?
        else {
            tracing::debug!("{}: no module generated", self.name);
            return Ok(SessionOutcome::NoArtifact);
        };

        self.verifier.verify_module(&path, &self.name)
    }
}
