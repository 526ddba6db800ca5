use core::any::type_name;
use core::error::Error;
use core::fmt;

/// Snapshot of an error attached to a log message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogException {
    type_name: String,
    message: String,
    trace: String,
}

impl LogException {
    /// Builds an exception from its parts.
    pub fn new<T, M, S>(type_name: T, message: M, trace: S) -> Self
    where
        T: Into<String>,
        M: Into<String>,
        S: Into<String>,
    {
        Self {
            type_name: type_name.into(),
            message: message.into(),
            trace: trace.into(),
        }
    }

    /// Captures an error's type, message and source chain.
    pub fn from_error<E: Error + 'static>(error: &E) -> Self {
        let mut causes = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            causes.push(cause.to_string());
            source = cause.source();
        }

        Self {
            type_name: type_name::<E>().to_owned(),
            message: error.to_string(),
            trace: causes.join(" ---> "),
        }
    }

    /// Fully qualified type name of the error.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The error's own message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Causes of the error, outermost first.
    pub fn trace(&self) -> &str {
        &self.trace
    }
}

impl fmt::Display for LogException {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{} {} {}", self.type_name, self.message, self.trace)
    }
}

/// Text written for a message, with the exception appended when present.
pub fn format_content(message: &str, exception: Option<&LogException>) -> String {
    match exception {
        None => message.to_owned(),
        Some(exception) => format!("message: {message} exception: {exception}"),
    }
}
