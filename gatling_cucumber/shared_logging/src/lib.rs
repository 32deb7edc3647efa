#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Structured logging sinks shared by the report generator crates.
//!
//! A [`LogRecord`] is fanned out to any number of [`LogSink`]s: a JSON-lines
//! file ([`JsonLogger`]), a human-readable console echo ([`ConsoleLogger`]) or
//! an in-memory buffer used by tests ([`MemoryLogger`]).

use std::{
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
};

use anyhow::Result;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Log severity level.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    /// Detail lines, echoed without a prefix.
    Debug,
    /// Progress messages.
    Info,
    /// Suspicious input that does not stop a run.
    Warn,
    /// Recorded or fatal errors.
    Error,
}

impl LogLevel {
    /// Console prefix used when echoing a record.
    #[must_use]
    pub const fn prefix(self) -> Option<&'static str> {
        match self {
            Self::Debug => None,
            Self::Info => Some("INFO"),
            Self::Warn => Some("WARN"),
            Self::Error => Some("FAIL"),
        }
    }
}

/// Structured log record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    /// Timestamp in ISO8601.
    pub timestamp: DateTime<Utc>,
    /// Module emitting the log.
    pub module: String,
    /// Severity.
    pub level: LogLevel,
    /// Human-readable message.
    pub message: String,
    /// Arbitrary JSON payload (paths, names, counters).
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl LogRecord {
    /// Creates a record with the provided info.
    #[must_use]
    pub fn new(module: impl Into<String>, level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            module: module.into(),
            level,
            message: message.into(),
            metadata: serde_json::Map::new(),
        }
    }

    /// Attaches metadata taken from a JSON object; other values are ignored.
    #[must_use]
    pub fn with_metadata(mut self, metadata: &serde_json::Value) -> Self {
        if let Some(obj) = metadata.as_object() {
            self.metadata = obj.clone();
        }
        self
    }
}

/// Destination for log records.
pub trait LogSink: Send + Sync {
    /// Writes one record.
    fn log(&self, record: &LogRecord) -> Result<()>;
}

/// Thread-safe JSON logger with append-only semantics.
#[derive(Debug)]
pub struct JsonLogger {
    path: PathBuf,
    writer: Mutex<File>,
}

impl JsonLogger {
    /// Opens the log file for appending, creating parent folders as needed.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        Ok(Self {
            path,
            writer: Mutex::new(file),
        })
    }

    /// Log file being appended to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LogSink for JsonLogger {
    fn log(&self, record: &LogRecord) -> Result<()> {
        let mut writer = self.writer.lock();
        serde_json::to_writer(&mut *writer, record)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}

/// Echoes records to stdout in the `INFO: ...` / `FAIL: ...` console style.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleLogger;

impl ConsoleLogger {
    /// Creates a console logger writing to stdout.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Renders a record the way it appears on the console.
    #[must_use]
    pub fn render(record: &LogRecord) -> String {
        match record.level.prefix() {
            Some(prefix) => format!("{prefix}: {}", record.message),
            None => record.message.clone(),
        }
    }
}

impl LogSink for ConsoleLogger {
    fn log(&self, record: &LogRecord) -> Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "{}", Self::render(record))?;
        Ok(())
    }
}

/// Keeps records in memory so tests can inspect what was logged.
#[derive(Debug, Default)]
pub struct MemoryLogger {
    records: Mutex<Vec<LogRecord>>,
}

impl MemoryLogger {
    /// Creates an empty capture buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of captured records, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }

    /// Messages of captured records at the given level.
    #[must_use]
    pub fn messages(&self, level: LogLevel) -> Vec<String> {
        self.records
            .lock()
            .iter()
            .filter(|record| record.level == level)
            .map(|record| record.message.clone())
            .collect()
    }
}

impl LogSink for MemoryLogger {
    fn log(&self, record: &LogRecord) -> Result<()> {
        self.records.lock().push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn json_logger_appends_one_record_per_line() {
        let dir = tempdir().unwrap();
        let logger = JsonLogger::new(dir.path().join("logs").join("report.log")).unwrap();
        logger
            .log(&LogRecord::new("generate", LogLevel::Info, "created report"))
            .unwrap();
        logger
            .log(
                &LogRecord::new("generate", LogLevel::Error, "missing end time")
                    .with_metadata(&serde_json::json!({ "file": "simulation.log" })),
            )
            .unwrap();
        let content = fs::read_to_string(logger.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("\"message\":\"created report\""));
        assert!(lines[1].contains("\"level\":\"ERROR\""));
        assert!(lines[1].contains("\"file\":\"simulation.log\""));
    }

    #[test]
    fn console_rendering_uses_level_prefix() {
        let info = LogRecord::new("generate", LogLevel::Info, "Passed 1 Failed: 0 Errors: 0");
        let fail = LogRecord::new("generate", LogLevel::Error, "Value 'x' is not numeric");
        let plain = LogRecord::new("generate", LogLevel::Debug, "    report.json Tag: <none>");
        assert_eq!(
            ConsoleLogger::render(&info),
            "INFO: Passed 1 Failed: 0 Errors: 0"
        );
        assert_eq!(
            ConsoleLogger::render(&fail),
            "FAIL: Value 'x' is not numeric"
        );
        assert_eq!(ConsoleLogger::render(&plain), "    report.json Tag: <none>");
    }

    #[test]
    fn memory_logger_filters_by_level() {
        let logger = MemoryLogger::new();
        logger
            .log(&LogRecord::new("m", LogLevel::Info, "one"))
            .unwrap();
        logger
            .log(&LogRecord::new("m", LogLevel::Error, "two"))
            .unwrap();
        assert_eq!(logger.snapshot().len(), 2);
        assert_eq!(logger.messages(LogLevel::Error), vec!["two".to_string()]);
    }
}
