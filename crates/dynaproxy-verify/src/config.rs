//! Harness configuration loaded from TOML.

use crate::error::{Result, VerifyError};
use serde::{Deserialize, Serialize};
use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable pointing at an explicit config file.
pub const CONFIG_ENV: &str = "DYNAPROXY_VERIFY_CONFIG";

/// Environment variable with extra probing directories, in `PATH` syntax.
pub const PROBING_PATHS_ENV: &str = "DYNAPROXY_PEVERIFY_PROBING_PATHS";

/// Config key operators must fix when the Reference verifier is missing.
pub const PROBING_PATHS_KEY: &str = "verifier.probing_paths";

/// Complete harness configuration.
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Verifier discovery and invocation settings
    #[serde(default)]
    pub verifier: VerifierConfig,
}

/// Verifier discovery and invocation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    /// Ordered directories searched for `peverify.exe` on the Reference platform
    pub probing_paths: Vec<PathBuf>,
    /// Seconds to wait for the verifier before killing it; `0` waits forever
    pub timeout_seconds: u64,
    /// Explicit verifier path, skipping discovery
    pub tool: Option<PathBuf>,
    /// Working directory for verifier runs; defaults to the current directory
    pub working_dir: Option<PathBuf>,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            probing_paths: [
                r"C:\Program Files (x86)\Microsoft SDKs\Windows\v10.0A\bin\NETFX 4.8 Tools",
                r"C:\Program Files (x86)\Microsoft SDKs\Windows\v10.0A\bin\NETFX 4.7.2 Tools",
                r"C:\Program Files (x86)\Microsoft SDKs\Windows\v10.0A\bin\NETFX 4.6.1 Tools",
                r"C:\Program Files (x86)\Microsoft SDKs\Windows\v8.1A\bin\NETFX 4.5.1 Tools",
                r"C:\Program Files (x86)\Microsoft SDKs\Windows\v7.0A\Bin",
            ]
            .into_iter()
            .map(PathBuf::from)
            .collect(),
            timeout_seconds: 300,
            tool: None,
            working_dir: None,
        }
    }
}

impl VerifierConfig {
    /// Verifier deadline, or `None` when runs are unbounded.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_seconds > 0).then(|| Duration::from_secs(self.timeout_seconds))
    }

    /// Prepends directories to the probing list, keeping their order.
    pub fn prepend_probing_paths<I: IntoIterator<Item = PathBuf>>(&mut self, paths: I) {
        let mut merged: Vec<PathBuf> = paths.into_iter().collect();
        merged.append(&mut self.probing_paths);
        self.probing_paths = merged;
    }
}

impl HarnessConfig {
    /// Default config file path (`~/.dynaproxy/verify.toml`)
    ///
    /// # Errors
    /// Returns an error if the home directory cannot be determined
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| VerifyError::Config("Could not determine home directory".to_owned()))?;
        Ok(home.join(".dynaproxy").join("verify.toml"))
    }

    /// Load config from `$DYNAPROXY_VERIFY_CONFIG`, else the default path if it
    /// exists, else defaults. Extra probing paths from the environment are
    /// prepended.
    ///
    /// # Errors
    /// Returns an error if a config file exists but cannot be read or parsed
    pub fn load() -> Result<Self> {
        Self::load_with(|key| env::var_os(key))
    }

    /// Like [`HarnessConfig::load`], reading variables through `lookup`
    /// instead of the process environment.
    ///
    /// # Errors
    /// Returns an error if a config file exists but cannot be read or parsed
    pub fn load_with<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<OsString>,
    {
        Self::load_from_sources(lookup, Self::default_path().ok())
    }

    fn load_from_sources<F>(lookup: F, default_path: Option<PathBuf>) -> Result<Self>
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let mut config = match (lookup(CONFIG_ENV), default_path) {
            (Some(path), _) => Self::load_from_file(Path::new(&path))?,
            (None, Some(path)) if path.exists() => Self::load_from_file(&path)?,
            (None, _) => Self::default(),
        };

        if let Some(extra) = lookup(PROBING_PATHS_ENV) {
            config.verifier.prepend_probing_paths(env::split_paths(&extra));
        }

        Ok(config)
    }

    /// Load config from a specific file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config = Self::from_toml(&contents)?;
        tracing::debug!(
            "Loaded verifier config from {:?}: {} probing path(s), timeout {}s",
            path,
            config.verifier.probing_paths.len(),
            config.verifier.timeout_seconds
        );
        Ok(config)
    }

    /// Parse config from TOML text
    ///
    /// # Errors
    /// Returns an error if the text is not valid config TOML
    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }
}
