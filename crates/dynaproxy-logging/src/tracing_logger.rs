use crate::exception::{LogException, format_content};
use crate::level::LoggerLevel;
use crate::logger::Logger;

/// Logger that writes every message as a `tracing` event.
///
/// The logger name is recorded in the `logger` field; fatal messages are
/// `ERROR` events with `fatal = true`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingLogger {
    name: String,
    level: LoggerLevel,
}

impl TracingLogger {
    /// Creates a logger emitting everything down to debug level.
    pub fn new<T: Into<String>>(tag: T) -> Self {
        Self {
            name: tag.into(),
            level: LoggerLevel::Debug,
        }
    }

    /// Sets the verbosity threshold.
    #[must_use]
    pub fn with_level(mut self, level: LoggerLevel) -> Self {
        self.level = level;
        self
    }
}

impl Logger for TracingLogger {
    fn name(&self) -> &str {
        &self.name
    }

    fn level(&self) -> LoggerLevel {
        self.level
    }

    fn create_child_logger(&self, name: &str) -> Box<dyn Logger> {
        Box::new(Self::new(format!("{}.{name}", self.name)))
    }

    fn log(
        &self,
        level: LoggerLevel,
        logger_name: &str,
        message: &str,
        exception: Option<&LogException>,
    ) {
        let content = format_content(message, exception);
        match level {
            LoggerLevel::Fatal => tracing::error!(logger = logger_name, fatal = true, "{content}"),
            LoggerLevel::Error => tracing::error!(logger = logger_name, "{content}"),
            LoggerLevel::Warn => tracing::warn!(logger = logger_name, "{content}"),
            LoggerLevel::Info => tracing::info!(logger = logger_name, "{content}"),
            LoggerLevel::Debug => tracing::debug!(logger = logger_name, "{content}"),
            LoggerLevel::Off => tracing::trace!(logger = logger_name, "{content}"),
        }
    }
}
