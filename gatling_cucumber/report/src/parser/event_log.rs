//! Per-simulation `simulation.log` records: the run marker and session end times.

use std::{fs, path::Path};

use serde_json::json;

use crate::{
    error::{GenerateError, Recorded, RecordedError},
    telemetry::ReportTelemetry,
};

use super::split_lines;

/// Minimum number of tab-separated fields for a line to be interpreted.
pub const MIN_FIELDS: usize = 6;

/// Interpretation of one `simulation.log` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLine<'a> {
    /// `RUN  <name>  <id>  <start>  ...`
    Run {
        /// Simulation class name.
        name: &'a str,
        /// Simulation id.
        id: &'a str,
        /// Raw start timestamp field.
        start: &'a str,
    },
    /// `USER  <scenario>  <user>  END  <start>  <end>`
    UserEnd {
        /// Raw end timestamp field.
        end: &'a str,
    },
    /// Anything else (`ASSERTION`, `REQUEST`, `USER ... START`, short lines).
    Other,
}

/// Classifies a line by its first field.
#[must_use]
pub fn classify_line(line: &str) -> LogLine<'_> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < MIN_FIELDS {
        return LogLine::Other;
    }
    match (fields[0], fields[3]) {
        ("RUN", _) => LogLine::Run {
            name: fields[1],
            id: fields[2],
            start: fields[3],
        },
        ("USER", "END") => LogLine::UserEnd { end: fields[5] },
        _ => LogLine::Other,
    }
}

/// A simulation run as described by its `simulation.log`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerformanceRun {
    /// Simulation class name from the `RUN` line.
    pub name: Option<String>,
    /// Simulation id from the `RUN` line (falls back to the name).
    pub id: Option<String>,
    /// Start time, epoch milliseconds.
    pub start_epoch_millis: Option<u64>,
    /// End time of the last `USER ... END` line, epoch milliseconds.
    pub end_epoch_millis: Option<u64>,
    /// Every line of the log, verbatim.
    pub raw_lines: Vec<String>,
}

impl PerformanceRun {
    /// `end - start` in milliseconds, or 0 when either bound is missing.
    #[must_use]
    pub fn elapsed_millis(&self) -> i64 {
        match (self.start_epoch_millis, self.end_epoch_millis) {
            (Some(start), Some(end)) => {
                i64::try_from(end).unwrap_or(i64::MAX) - i64::try_from(start).unwrap_or(i64::MAX)
            }
            _ => 0,
        }
    }

    /// Name, or an empty string when the log did not carry one.
    #[must_use]
    pub fn name_or_default(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }

    /// Id, or an empty string when neither id nor name were present.
    #[must_use]
    pub fn id_or_default(&self) -> &str {
        self.id.as_deref().unwrap_or_default()
    }
}

/// Reads and parses a `simulation.log` file.
pub fn load_event_log(
    path: &Path,
    telemetry: &ReportTelemetry,
) -> Result<Recorded<PerformanceRun>, GenerateError> {
    telemetry.detail(format!("Processing performance log file '{}'", path.display()));
    let text = fs::read_to_string(path).map_err(|err| GenerateError::io(path, err))?;
    Ok(parse_event_log(path, &text, telemetry))
}

/// Extracts the run marker and session end from event-log text.
///
/// Always yields a run; each missing field adds one recorded error. When
/// several `USER ... END` lines exist the last one in file order wins.
pub fn parse_event_log(file: &Path, text: &str, telemetry: &ReportTelemetry) -> Recorded<PerformanceRun> {
    let raw_lines = split_lines(text);

    let mut name = None;
    let mut id = None;
    let mut start = None;
    let mut end = None;

    for line in &raw_lines {
        match classify_line(line) {
            LogLine::Run {
                name: run_name,
                id: run_id,
                start: run_start,
            } => {
                name = non_empty(run_name);
                id = non_empty(run_id);
                start = parse_numeric(run_start, telemetry);
            }
            LogLine::UserEnd { end: user_end } => {
                end = parse_numeric(user_end, telemetry);
            }
            LogLine::Other => {}
        }
    }

    let mut errors = Vec::new();
    if name.is_none() {
        errors.push(RecordedError::MissingName(file.to_path_buf()));
    }
    if id.is_none() {
        errors.push(RecordedError::MissingId(file.to_path_buf()));
        id.clone_from(&name);
    }
    if start.is_none() {
        errors.push(RecordedError::MissingStart(file.to_path_buf()));
    }
    if end.is_none() {
        errors.push(RecordedError::MissingEnd(file.to_path_buf()));
    }

    Recorded::with_errors(
        PerformanceRun {
            name,
            id,
            start_epoch_millis: start,
            end_epoch_millis: end,
            raw_lines,
        },
        errors,
    )
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

/// Parses an all-digits field; anything else is logged and treated as absent.
fn parse_numeric(value: &str, telemetry: &ReportTelemetry) -> Option<u64> {
    let parsed = if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
        value.parse().ok()
    } else {
        None
    };
    if parsed.is_none() {
        telemetry.fail(
            format!("Value '{value}' is not numeric"),
            &json!({ "value": value }),
        );
    }
    parsed
}
