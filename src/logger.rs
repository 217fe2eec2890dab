//! Reporting of content errors.
//!
//! Malformed configuration lines, unknown command-line tokens, and failed
//! validations never abort processing. Each one is handed to a [`Logger`] and
//! the parser or resolver moves on, so a single run surfaces every defect.
//!
//! The logger is injected (see [`OptfigBuilder::logger`](crate::OptfigBuilder::logger)).
//! Without one, [`StderrLogger`] is used.

use std::fmt;

use parking_lot::Mutex;

/// Severity attached to a reported message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Fatal => "fatal",
        };
        f.write_str(name)
    }
}

/// Receiver of content errors and warnings.
///
/// Implementations must not fail; the caller continues after every call.
pub trait Logger: Send + Sync {
    fn log(&self, severity: Severity, message: &str);
}

/// Writes `"<severity>: <message>"` lines to standard error.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrLogger;

impl Logger for StderrLogger {
    fn log(&self, severity: Severity, message: &str) {
        eprintln!("{severity}: {message}");
    }
}

/// Forwards every message to the [`log`] crate facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogCrateLogger;

impl Logger for LogCrateLogger {
    fn log(&self, severity: Severity, message: &str) {
        let level = match severity {
            Severity::Debug => log::Level::Debug,
            Severity::Info => log::Level::Info,
            Severity::Warning => log::Level::Warn,
            Severity::Error | Severity::Fatal => log::Level::Error,
        };
        log::log!(target: "optfig", level, "{message}");
    }
}

/// Keeps every reported message in memory.
///
/// Useful for hosts that want to print the complete list of problems at the
/// end of a run, and for asserting exact error counts in tests.
#[derive(Debug, Default)]
pub struct MessageCollector {
    messages: Mutex<Vec<(Severity, String)>>,
}

impl MessageCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// All messages received so far, oldest first.
    pub fn messages(&self) -> Vec<(Severity, String)> {
        self.messages.lock().clone()
    }

    /// Number of messages at `Error` severity or above.
    pub fn error_count(&self) -> usize {
        self.messages
            .lock()
            .iter()
            .filter(|(severity, _)| *severity >= Severity::Error)
            .count()
    }

    /// Messages at `Error` severity or above.
    pub fn errors(&self) -> Vec<String> {
        self.messages
            .lock()
            .iter()
            .filter(|(severity, _)| *severity >= Severity::Error)
            .map(|(_, msg)| msg.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.messages.lock().clear();
    }
}

impl Logger for MessageCollector {
    fn log(&self, severity: Severity, message: &str) {
        self.messages.lock().push((severity, message.to_string()));
    }
}
