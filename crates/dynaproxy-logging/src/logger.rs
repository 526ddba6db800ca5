use crate::exception::LogException;
use crate::level::LoggerLevel;
use core::fmt;

/// Named, level-filtered logger.
///
/// Implementors supply the sink ([`Logger::log`]); the provided methods
/// drop anything above [`Logger::level`] before it reaches the sink.
pub trait Logger: Send + Sync {
    /// Name written with every message.
    fn name(&self) -> &str;

    /// Most verbose level this logger emits.
    fn level(&self) -> LoggerLevel;

    /// Creates a logger named `"{self.name()}.{name}"`.
    fn create_child_logger(&self, name: &str) -> Box<dyn Logger>;

    /// Writes one message unconditionally.
    fn log(
        &self,
        level: LoggerLevel,
        logger_name: &str,
        message: &str,
        exception: Option<&LogException>,
    );

    /// Whether messages at `level` are emitted.
    fn is_enabled(&self, level: LoggerLevel) -> bool {
        self.level().allows(level)
    }

    /// Forwards to the sink if `level` is enabled.
    fn emit(&self, level: LoggerLevel, message: &str, exception: Option<&LogException>) {
        if self.is_enabled(level) {
            self.log(level, self.name(), message, exception);
        }
    }

    /// Formats and forwards only if `level` is enabled.
    fn emit_fmt(&self, level: LoggerLevel, args: fmt::Arguments<'_>) {
        if self.is_enabled(level) {
            self.log(level, self.name(), &args.to_string(), None);
        }
    }

    /// Whether debug messages are emitted.
    fn is_debug_enabled(&self) -> bool {
        self.is_enabled(LoggerLevel::Debug)
    }

    /// Whether info messages are emitted.
    fn is_info_enabled(&self) -> bool {
        self.is_enabled(LoggerLevel::Info)
    }

    /// Whether warnings are emitted.
    fn is_warn_enabled(&self) -> bool {
        self.is_enabled(LoggerLevel::Warn)
    }

    /// Whether errors are emitted.
    fn is_error_enabled(&self) -> bool {
        self.is_enabled(LoggerLevel::Error)
    }

    /// Whether fatal messages are emitted.
    fn is_fatal_enabled(&self) -> bool {
        self.is_enabled(LoggerLevel::Fatal)
    }

    /// Logs at debug level.
    fn debug(&self, message: &str) {
        self.emit(LoggerLevel::Debug, message, None);
    }

    /// Logs at debug level with an exception.
    fn debug_exception(&self, message: &str, exception: &LogException) {
        self.emit(LoggerLevel::Debug, message, Some(exception));
    }

    /// Logs at info level.
    fn info(&self, message: &str) {
        self.emit(LoggerLevel::Info, message, None);
    }

    /// Logs at info level with an exception.
    fn info_exception(&self, message: &str, exception: &LogException) {
        self.emit(LoggerLevel::Info, message, Some(exception));
    }

    /// Logs a warning.
    fn warn(&self, message: &str) {
        self.emit(LoggerLevel::Warn, message, None);
    }

    /// Logs a warning with an exception.
    fn warn_exception(&self, message: &str, exception: &LogException) {
        self.emit(LoggerLevel::Warn, message, Some(exception));
    }

    /// Logs an error.
    fn error(&self, message: &str) {
        self.emit(LoggerLevel::Error, message, None);
    }

    /// Logs an error with an exception.
    fn error_exception(&self, message: &str, exception: &LogException) {
        self.emit(LoggerLevel::Error, message, Some(exception));
    }

    /// Logs a fatal message.
    fn fatal(&self, message: &str) {
        self.emit(LoggerLevel::Fatal, message, None);
    }

    /// Logs a fatal message with an exception.
    fn fatal_exception(&self, message: &str, exception: &LogException) {
        self.emit(LoggerLevel::Fatal, message, Some(exception));
    }
}
