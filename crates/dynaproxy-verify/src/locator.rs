//! Discovery of the external verifier executable.

use crate::config::{HarnessConfig, PROBING_PATHS_KEY};
use crate::error::ToolNotFound;
use crate::platform::PlatformVariant;
use core::fmt;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::{Arc, OnceLock};

/// Command name of the verifier on the Alternate platform's search path.
pub const SEARCH_PATH_COMMAND: &str = "peverify";

/// File name of the verifier inside a Reference probing directory.
pub const PROBED_FILE_NAME: &str = "peverify.exe";

/// Resolved verifier invocation target: an absolute path or a bare command.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ToolPath(PathBuf);

impl ToolPath {
    /// Wraps a path or command name.
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self(path.into())
    }

    /// The path as passed to the process launcher.
    pub fn as_path(&self) -> &Path {
        &self.0
    }
}

impl AsRef<OsStr> for ToolPath {
    fn as_ref(&self) -> &OsStr {
        self.0.as_os_str()
    }
}

impl fmt::Display for ToolPath {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0.display())
    }
}

/// A way of finding the verifier.
pub trait LocateStrategy: Send + Sync {
    /// Finds the verifier.
    ///
    /// # Errors
    /// Returns `ToolNotFound` when no candidate is usable.
    fn locate(&self) -> Result<ToolPath, ToolNotFound>;
}

/// Confirms a command is on the search path by starting it once.
#[derive(Debug, Clone)]
pub struct SearchPathProbe {
    command: String,
    working_dir: Option<PathBuf>,
}

impl SearchPathProbe {
    /// Probe for the given command name.
    pub fn new<T: Into<String>>(command: T) -> Self {
        Self {
            command: command.into(),
            working_dir: None,
        }
    }

    /// Runs the probe from the given directory.
    #[must_use]
    pub fn with_working_dir(mut self, working_dir: PathBuf) -> Self {
        self.working_dir = Some(working_dir);
        self
    }
}

impl LocateStrategy for SearchPathProbe {
    fn locate(&self) -> Result<ToolPath, ToolNotFound> {
        let mut command = Command::new(&self.command);
        command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|err| {
            tracing::debug!("Probe for {} failed to start: {err}", self.command);
            ToolNotFound::new(format!(
                "Please ensure that {} is installed in a folder that is part of the PATH environment ({err})",
                self.command
            ))
        })?;

        // Any exit code proves reachability; the wait only reaps the child.
        match child.wait() {
            Ok(status) => tracing::debug!("Probe for {} exited with {status}", self.command),
            Err(err) => tracing::debug!("Probe for {} could not be reaped: {err}", self.command),
        }

        Ok(ToolPath::new(&self.command))
    }
}

/// Looks for a fixed file name under an ordered list of directories.
#[derive(Debug, Clone)]
pub struct ProbingDirectories {
    directories: Vec<PathBuf>,
    file_name: String,
}

impl ProbingDirectories {
    /// Search `directories` in order for `file_name`.
    pub fn new<T: Into<String>>(directories: Vec<PathBuf>, file_name: T) -> Self {
        Self {
            directories,
            file_name: file_name.into(),
        }
    }
}

impl LocateStrategy for ProbingDirectories {
    fn locate(&self) -> Result<ToolPath, ToolNotFound> {
        self.directories
            .iter()
            .map(|dir| dir.join(&self.file_name))
            .find(|candidate| {
                let found = candidate.is_file();
                tracing::trace!("Probing {}: {found}", candidate.display());
                found
            })
            .map(ToolPath::new)
            .ok_or_else(|| {
                ToolNotFound::new(format!(
                    "Please check the {PROBING_PATHS_KEY} configuration setting and set it to the folder where {} is located",
                    self.file_name
                ))
            })
    }
}

/// Resolves the verifier once and remembers the outcome, success or failure.
pub struct ToolLocator {
    strategy: Box<dyn LocateStrategy>,
    resolved: OnceLock<Result<ToolPath, ToolNotFound>>,
}

static GLOBAL: OnceLock<Arc<ToolLocator>> = OnceLock::new();

impl ToolLocator {
    /// Locator driven by an arbitrary strategy.
    pub fn new(strategy: Box<dyn LocateStrategy>) -> Self {
        Self {
            strategy,
            resolved: OnceLock::new(),
        }
    }

    /// Locator that already knows the answer.
    pub fn resolved(path: ToolPath) -> Self {
        Self {
            strategy: Box::new(Fixed(path.clone())),
            resolved: OnceLock::from(Ok(path)),
        }
    }

    /// Locator using the platform's standard strategy.
    pub fn for_platform(platform: PlatformVariant, config: &HarnessConfig) -> Self {
        if let Some(tool) = &config.verifier.tool {
            return Self::resolved(ToolPath::new(tool));
        }

        match platform {
            PlatformVariant::Alternate => {
                let mut probe = SearchPathProbe::new(SEARCH_PATH_COMMAND);
                if let Some(dir) = &config.verifier.working_dir {
                    probe = probe.with_working_dir(dir.clone());
                }
                Self::new(Box::new(probe))
            }
            PlatformVariant::Reference => Self::new(Box::new(ProbingDirectories::new(
                config.verifier.probing_paths.clone(),
                PROBED_FILE_NAME,
            ))),
        }
    }

    /// The process-wide locator. The first call fixes platform and config
    /// for the rest of the run; later arguments are ignored.
    pub fn global(platform: PlatformVariant, config: &HarnessConfig) -> Arc<Self> {
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(Self::for_platform(platform, config))))
    }

    /// Resolves the verifier, running the strategy at most once.
    ///
    /// # Errors
    /// Returns the cached `ToolNotFound` if resolution failed.
    pub fn resolve(&self) -> Result<ToolPath, ToolNotFound> {
        self.resolved
            .get_or_init(|| {
                let outcome = self.strategy.locate();
                match &outcome {
                    Ok(path) => tracing::info!("Using verifier at {path}"),
                    Err(err) => tracing::error!("{err}"),
                }
                outcome
            })
            .clone()
    }
}

impl fmt::Debug for ToolLocator {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ToolLocator")
            .field("resolved", &self.resolved.get())
            .finish_non_exhaustive()
    }
}

struct Fixed(ToolPath);

impl LocateStrategy for Fixed {
    fn locate(&self) -> Result<ToolPath, ToolNotFound> {
        Ok(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{File, create_dir_all};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use tempfile::TempDir;

    struct Counting {
        calls: Arc<AtomicUsize>,
        outcome: Result<ToolPath, ToolNotFound>,
    }

    impl LocateStrategy for Counting {
        fn locate(&self) -> Result<ToolPath, ToolNotFound> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            thread::yield_now();
            self.outcome.clone()
        }
    }

    #[test]
    fn test_probing_directories_returns_first_match() {
        let temp = TempDir::new().unwrap();
        let empty = temp.path().join("empty");
        let first = temp.path().join("first");
        let second = temp.path().join("second");
        for dir in [&empty, &first, &second] {
            create_dir_all(dir).unwrap();
        }
        File::create(first.join(PROBED_FILE_NAME)).unwrap();
        File::create(second.join(PROBED_FILE_NAME)).unwrap();

        let strategy = ProbingDirectories::new(vec![empty, first.clone(), second], PROBED_FILE_NAME);
        assert_eq!(
            strategy.locate().unwrap(),
            ToolPath::new(first.join(PROBED_FILE_NAME))
        );
    }

    #[test]
    fn test_probing_directories_ignores_directory_with_tool_name() {
        let temp = TempDir::new().unwrap();
        create_dir_all(temp.path().join(PROBED_FILE_NAME)).unwrap();

        let strategy = ProbingDirectories::new(vec![temp.path().to_path_buf()], PROBED_FILE_NAME);
        assert!(strategy.locate().is_err());
    }

    #[test]
    fn test_probing_directories_names_config_key() {
        let strategy = ProbingDirectories::new(vec![PathBuf::from("/nonexistent/sdk")], PROBED_FILE_NAME);
        let err = strategy.locate().unwrap_err();
        assert!(err.guidance.contains(PROBING_PATHS_KEY));
    }

    #[test]
    fn test_search_path_probe_missing_command() {
        let probe = SearchPathProbe::new("dynaproxy-no-such-verifier-4f1c");
        let err = probe.locate().unwrap_err();
        assert!(err.guidance.contains("PATH"));
    }

    #[cfg(unix)]
    #[test]
    fn test_search_path_probe_accepts_any_exit_code() {
        // `false` starts fine and exits nonzero.
        let probe = SearchPathProbe::new("false");
        assert_eq!(probe.locate().unwrap(), ToolPath::new("false"));
    }

    #[test]
    fn test_resolution_runs_once_across_threads() {
        let calls = Arc::new(AtomicUsize::new(0));
        let locator = Arc::new(ToolLocator::new(Box::new(Counting {
            calls: Arc::clone(&calls),
            outcome: Ok(ToolPath::new("peverify")),
        })));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let locator = Arc::clone(&locator);
                thread::spawn(move || locator.resolve())
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap().unwrap(), ToolPath::new("peverify"));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failure_is_cached() {
        let calls = Arc::new(AtomicUsize::new(0));
        let locator = ToolLocator::new(Box::new(Counting {
            calls: Arc::clone(&calls),
            outcome: Err(ToolNotFound::new("missing")),
        }));

        assert_eq!(locator.resolve(), Err(ToolNotFound::new("missing")));
        assert_eq!(locator.resolve(), Err(ToolNotFound::new("missing")));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_configured_tool_skips_discovery() {
        let mut config = HarnessConfig::default();
        config.verifier.tool = Some(PathBuf::from("/opt/verifier/peverify"));
        config.verifier.probing_paths.clear();

        let locator = ToolLocator::for_platform(PlatformVariant::Reference, &config);
        assert_eq!(
            locator.resolve().unwrap(),
            ToolPath::new("/opt/verifier/peverify")
        );
    }
}
