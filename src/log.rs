//! Per-request log accumulation.
//!
//! Every request gets one [`LogRecord`]. The dispatcher and the handler stages
//! append lines to it while the request runs; when the request is over the
//! dispatcher hands the full text to a [`LogSink`](crate::LogSink) exactly
//! once. Nothing is written anywhere until then, so the lines of concurrent
//! requests never interleave.
//!
//! A line looks like:
//!
//! ```text
//! INFO   2026-10-18 11:14:02   src/orders.rs:41	order accepted   ‹trace›   id=7 user=ana
//! ```

use std::fmt::{self, Write as _};
use std::panic::Location;

use chrono::{DateTime, Local};

use crate::config::Environment;

/// Renders the timestamp at the start of every line.
pub type TimeFormat = fn(DateTime<Local>) -> String;

/// `2026-10-18 11:14:02`.
pub fn default_time_format(time: DateTime<Local>) -> String {
    time.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Severity of a log line.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Level {
    Info,
    Warning,
    Severe,
    Fatal,
    Panic,
    Trace,
    Debug,
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info    => "INFO",
            Self::Warning => "WARNING",
            Self::Severe  => "SEVERE",
            Self::Fatal   => "FATAL",
            Self::Panic   => "PANIC",
            Self::Trace   => "TRACE",
            Self::Debug   => "DEBUG",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append-only text log for one request.
#[derive(Debug)]
pub struct LogRecord {
    buf: String,
    environment: Environment,
    time_format: TimeFormat,
}

impl LogRecord {
    pub fn new(environment: Environment, time_format: TimeFormat) -> Self {
        Self { buf: String::new(), environment, time_format }
    }

    #[track_caller]
    pub fn info(&mut self, message: impl fmt::Display) {
        self.log(Level::Info, message);
    }

    #[track_caller]
    pub fn warning(&mut self, message: impl fmt::Display) {
        self.log(Level::Warning, message);
    }

    #[track_caller]
    pub fn severe(&mut self, message: impl fmt::Display) {
        self.log(Level::Severe, message);
    }

    /// Dropped entirely in [`Environment::Production`].
    #[track_caller]
    pub fn debug(&mut self, message: impl fmt::Display) {
        self.log(Level::Debug, message);
    }

    #[track_caller]
    pub fn log(&mut self, level: Level, message: impl fmt::Display) {
        self.log_fields(level, message, std::iter::empty::<(&str, &str)>());
    }

    /// Logs a line with trailing `key=value` pairs.
    #[track_caller]
    pub fn log_fields<I, K, V>(&mut self, level: Level, message: impl fmt::Display, fields: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: fmt::Display,
        V: fmt::Display,
    {
        let caller = Location::caller();
        let mut rendered = String::new();
        for (key, value) in fields {
            if !rendered.is_empty() {
                rendered.push(' ');
            }
            let _ = write!(rendered, "{key}={value}");
        }
        self.write_line(level, caller.file(), caller.line(), message, "", &rendered);
    }

    /// Logs a recovered panic. `file`/`line` point at the panic site rather
    /// than the caller, and `trace` is the stack captured there.
    pub fn panic(&mut self, message: impl fmt::Display, file: &str, line: u32, trace: &str) {
        self.write_line(Level::Panic, file, line, message, trace, "");
    }

    fn write_line(
        &mut self,
        level: Level,
        file: &str,
        line: u32,
        message: impl fmt::Display,
        trace: &str,
        fields: &str,
    ) {
        if level == Level::Debug && self.environment == Environment::Production {
            return;
        }
        let time = (self.time_format)(Local::now());
        // Writing into a String cannot fail.
        let _ = writeln!(
            self.buf,
            "{level}   {time}   {file}:{line}\t{message}   {trace}   {fields}"
        );
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Moves the accumulated text out, leaving the record empty.
    pub(crate) fn take(&mut self) -> String {
        std::mem::take(&mut self.buf)
    }
}
