//! Common test utilities for dynaproxy-verify tests
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
        clippy::tests_outside_test_module,
        reason = "Test allows"
    )
)]

use dynaproxy_verify::{
    GenerationSubsystem, PersistentModuleBuilder, PlatformVariant, Result, TextEncoding,
    VerificationRun, VerifierRunner,
};
use std::env;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;
use tempfile::TempDir;
use tracing::Level;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{EnvFilter, fmt};

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests (idempotent).
/// Honors `RUST_LOG` if set, otherwise defaults to "debug".
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        let filter = env::var("RUST_LOG").unwrap_or_else(|_| "debug".to_owned());
        if fmt()
            .with_env_filter(EnvFilter::new(filter))
            .with_test_writer()
            .try_init()
            .is_err()
        {
            // tracing already initialized in this process
        }
    });
}

/// In-memory log sink for asserting on emitted lines.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    /// Everything written so far.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }

    /// Runs `body` with a subscriber writing into this sink.
    pub fn capture<T>(&self, body: impl FnOnce() -> T) -> T {
        let subscriber = fmt()
            .with_writer(self.clone())
            .with_ansi(false)
            .with_max_level(Level::TRACE)
            .finish();
        tracing::subscriber::with_default(subscriber, body)
    }
}

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'writer> MakeWriter<'writer> for CapturedLogs {
    type Writer = Self;

    fn make_writer(&'writer self) -> Self::Writer {
        self.clone()
    }
}

/// Generation subsystem saving modules into a temp directory.
///
/// The generator is the sequence number of the pair, so tests can tell a
/// fresh pair from a reused one.
pub struct TempSubsystem {
    dir: TempDir,
    created: AtomicUsize,
}

impl TempSubsystem {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp dir"),
            created: AtomicUsize::new(0),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

impl GenerationSubsystem for TempSubsystem {
    type Builder = PersistentModuleBuilder;
    type Generator = usize;

    fn create(&self) -> (Self::Builder, Self::Generator) {
        let generation = self.created.fetch_add(1, Ordering::SeqCst);
        (PersistentModuleBuilder::new(self.dir.path()), generation)
    }
}

/// Runner returning a canned result and recording what it was asked to verify.
pub struct CannedRunner {
    exit_code: i32,
    output: String,
    calls: AtomicUsize,
    artifacts: Mutex<Vec<PathBuf>>,
}

impl CannedRunner {
    pub fn new(exit_code: i32, output: &str) -> Arc<Self> {
        Arc::new(Self {
            exit_code,
            output: output.to_owned(),
            calls: AtomicUsize::new(0),
            artifacts: Mutex::new(vec![]),
        })
    }

    /// The runner as a trait object for `Verifier::new`.
    pub fn shared(this: &Arc<Self>) -> Arc<dyn VerifierRunner> {
        let runner: Arc<Self> = Arc::clone(this);
        runner
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn artifacts(&self) -> Vec<PathBuf> {
        self.artifacts.lock().unwrap().clone()
    }
}

impl VerifierRunner for CannedRunner {
    fn run(&self, artifact: &Path, _platform: PlatformVariant) -> Result<VerificationRun> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.artifacts.lock().unwrap().push(artifact.to_path_buf());
        Ok(VerificationRun {
            artifact: artifact.to_path_buf(),
            arguments: vec![],
            encoding: TextEncoding::Utf8,
            output: self.output.clone(),
            exit_code: self.exit_code,
            duration: Duration::ZERO,
        })
    }
}
