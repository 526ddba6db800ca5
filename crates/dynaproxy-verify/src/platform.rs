//! Host platform detection.

use core::fmt;
use std::env;
use std::sync::OnceLock;

/// Environment variable that forces the platform variant.
pub const PLATFORM_ENV: &str = "DYNAPROXY_VERIFY_PLATFORM";

/// Which verifier family the host provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlatformVariant {
    /// Verifier discovered through configured probing directories; strict verdicts.
    Reference,
    /// Verifier reachable on the search path; nonzero exits are exempted.
    Alternate,
}

static DETECTED: OnceLock<PlatformVariant> = OnceLock::new();

impl PlatformVariant {
    /// Platform of the current process, detected on first call and cached.
    pub fn current() -> Self {
        *DETECTED.get_or_init(|| {
            let detected = Self::detect(env::var(PLATFORM_ENV).ok().as_deref());
            tracing::debug!("Detected verifier platform: {detected}");
            detected
        })
    }

    /// Detects the platform from an optional override value.
    ///
    /// Unknown override values are ignored and the host default is used.
    pub fn detect(override_value: Option<&str>) -> Self {
        if let Some(value) = override_value {
            if let Some(parsed) = Self::parse(value) {
                return parsed;
            }
            tracing::warn!("Ignoring unknown {PLATFORM_ENV} value: {value}");
        }

        if cfg!(windows) {
            Self::Reference
        } else {
            Self::Alternate
        }
    }

    /// Parses `reference` or `alternate`, case-insensitively.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "reference" => Some(Self::Reference),
            "alternate" => Some(Self::Alternate),
            _ => None,
        }
    }
}

impl fmt::Display for PlatformVariant {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reference => formatter.write_str("reference"),
            Self::Alternate => formatter.write_str("alternate"),
        }
    }
}
