use core::fmt;

/// Verbosity threshold of a logger, from silent to most verbose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum LoggerLevel {
    /// Nothing is logged
    Off,
    /// Unrecoverable failures
    Fatal,
    /// Errors
    Error,
    /// Warnings
    Warn,
    /// Informational messages
    Info,
    /// Diagnostic detail
    #[default]
    Debug,
}

impl LoggerLevel {
    /// Whether a logger at this threshold emits messages at `level`.
    pub fn allows(self, level: Self) -> bool {
        level != Self::Off && level <= self
    }
}

impl fmt::Display for LoggerLevel {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Off => "OFF",
            Self::Fatal => "FATAL",
            Self::Error => "ERROR",
            Self::Warn => "WARN",
            Self::Info => "INFO",
            Self::Debug => "DEBUG",
        };
        formatter.write_str(name)
    }
}
