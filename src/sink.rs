//! Destinations for finished request logs.
//!
//! The dispatcher calls [`LogSink::flush`] once per request with the complete
//! text of that request's [`LogRecord`](crate::LogRecord). Many requests flush
//! concurrently, so a sink that touches shared state must serialize access
//! itself.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Datelike, Local};
use serde::Deserialize;
use tracing::error;

use crate::config::FileSinkConfig;

/// Receives one finished request log.
pub trait LogSink: Send + Sync + 'static {
    fn flush(&self, log: &str);
}

/// Emits each request log as a single `tracing` event at INFO.
///
/// This is the default sink: the record ends up wherever the process's
/// subscriber sends everything else.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn flush(&self, log: &str) {
        if log.is_empty() {
            return;
        }
        tracing::info!(target: "wicket::request", "\n{}", log.trim_end());
    }
}

/// How much time one log file covers.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Tenure {
    /// `2026-October-18-suffix.txt`
    #[default]
    Daily,
    /// `2026-42-suffix.txt` (ISO week)
    Weekly,
    /// `2026-October-suffix.txt`
    Monthly,
    /// `2026-suffix.txt`
    Yearly,
    /// `suffix.txt`
    Forever,
}

/// Appends request logs to time-bucketed files in one directory.
///
/// Writes are blocking and serialized behind a mutex; each flush is a single
/// `write_all` of an already-rendered record. If the file cannot be opened or
/// written, the record goes to stdout instead so it is never silently lost.
#[derive(Debug)]
pub struct FileSink {
    config: FileSinkConfig,
    lock: Mutex<()>,
}

impl FileSink {
    pub fn new(config: FileSinkConfig) -> Self {
        Self { config, lock: Mutex::new(()) }
    }

    /// The file a record flushed at `now` lands in.
    pub fn path_at(&self, now: DateTime<Local>) -> PathBuf {
        let suffix = &self.config.suffix;
        let name = match self.config.tenure {
            Tenure::Daily => {
                format!("{}-{}-{}-{suffix}.txt", now.year(), now.format("%B"), now.day())
            }
            Tenure::Weekly => {
                let week = now.iso_week();
                format!("{}-{}-{suffix}.txt", week.year(), week.week())
            }
            Tenure::Monthly => format!("{}-{}-{suffix}.txt", now.year(), now.format("%B")),
            Tenure::Yearly  => format!("{}-{suffix}.txt", now.year()),
            Tenure::Forever => format!("{suffix}.txt"),
        };
        self.config.dir.join(name)
    }

    fn append(&self, path: &PathBuf, log: &str) -> std::io::Result<()> {
        let mut options = OpenOptions::new();
        options.append(true).create(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        options.open(path)?.write_all(log.as_bytes())
    }
}

impl LogSink for FileSink {
    fn flush(&self, log: &str) {
        let path = self.path_at(Local::now());
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = self.append(&path, log) {
            error!(path = %path.display(), "unable to write request log: {e}");
            print!("{log}");
        }
    }
}
