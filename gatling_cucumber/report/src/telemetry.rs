use std::{fmt, path::PathBuf, sync::Arc};

use anyhow::Result;
use serde_json::{json, Value};
use shared_logging::{ConsoleLogger, JsonLogger, LogLevel, LogRecord, LogSink};

/// Telemetry builder for report generation.
pub struct ReportTelemetryBuilder {
    module: String,
    log_path: Option<PathBuf>,
    console: bool,
    sinks: Vec<Arc<dyn LogSink>>,
}

impl ReportTelemetryBuilder {
    /// Creates a new builder scoped to a module label.
    #[must_use]
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            log_path: None,
            console: false,
            sinks: Vec::new(),
        }
    }

    /// Appends JSON lines to the given file.
    #[must_use]
    pub fn log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = Some(path.into());
        self
    }

    /// Echoes records to stdout.
    #[must_use]
    pub const fn console(mut self, enabled: bool) -> Self {
        self.console = enabled;
        self
    }

    /// Adds an extra sink (tests attach a `MemoryLogger` here).
    #[must_use]
    pub fn sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Builds telemetry.
    pub fn build(self) -> Result<ReportTelemetry> {
        let mut sinks = self.sinks;
        if self.console {
            sinks.insert(0, Arc::new(ConsoleLogger::new()));
        }
        if let Some(path) = self.log_path {
            sinks.push(Arc::new(JsonLogger::new(path)?));
        }
        Ok(ReportTelemetry {
            inner: Arc::new(TelemetryInner {
                module: self.module,
                sinks,
            }),
        })
    }
}

/// Telemetry handle shared by the parsers, the synthesizer and the orchestrator.
#[derive(Clone)]
pub struct ReportTelemetry {
    inner: Arc<TelemetryInner>,
}

impl fmt::Debug for ReportTelemetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReportTelemetry")
            .field("module", &self.inner.module)
            .field("sinks", &self.inner.sinks.len())
            .finish()
    }
}

struct TelemetryInner {
    module: String,
    sinks: Vec<Arc<dyn LogSink>>,
}

impl ReportTelemetry {
    /// Returns a builder.
    #[must_use]
    pub fn builder(module: impl Into<String>) -> ReportTelemetryBuilder {
        ReportTelemetryBuilder::new(module)
    }

    /// Telemetry that drops every record.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            inner: Arc::new(TelemetryInner {
                module: String::new(),
                sinks: Vec::new(),
            }),
        }
    }

    /// Writes a record to every sink. Sink failures are ignored.
    pub fn log(&self, level: LogLevel, message: impl Into<String>, metadata: &Value) {
        if self.inner.sinks.is_empty() {
            return;
        }
        let record = LogRecord::new(&self.inner.module, level, message).with_metadata(metadata);
        for sink in &self.inner.sinks {
            let _ = sink.log(&record);
        }
    }

    /// Informational message.
    pub fn info(&self, message: impl Into<String>, metadata: &Value) {
        self.log(LogLevel::Info, message, metadata);
    }

    /// Unprefixed progress line.
    pub fn detail(&self, message: impl Into<String>) {
        self.log(LogLevel::Debug, message, &json!({}));
    }

    /// Failure line.
    pub fn fail(&self, message: impl Into<String>, metadata: &Value) {
        self.log(LogLevel::Error, message, metadata);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_logging::MemoryLogger;
    use tempfile::tempdir;

    #[test]
    fn telemetry_fans_out_to_all_sinks() {
        let tmp = tempdir().unwrap();
        let memory = Arc::new(MemoryLogger::new());
        let log_path = tmp.path().join("generate.log");
        let telemetry = ReportTelemetry::builder("generate")
            .log_path(&log_path)
            .sink(memory.clone())
            .build()
            .unwrap();
        telemetry.info("report.created", &json!({ "tag": "@EXAMPLE-10" }));
        telemetry.fail("Value 'abc' is not numeric", &json!({}));
        assert!(std::fs::read_to_string(&log_path)
            .unwrap()
            .contains("report.created"));
        assert_eq!(memory.snapshot().len(), 2);
        assert_eq!(
            memory.messages(LogLevel::Error),
            vec!["Value 'abc' is not numeric".to_string()]
        );
    }

    #[test]
    fn disabled_telemetry_is_silent() {
        let telemetry = ReportTelemetry::disabled();
        telemetry.info("nothing", &json!({}));
        assert!(format!("{telemetry:?}").contains("sinks: 0"));
    }
}
