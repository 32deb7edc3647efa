//! Fatal and recorded error types.
//!
//! [`GenerateError`] aborts a whole run. [`RecordedError`] is collected into the
//! run's error list while processing carries on with best-effort defaults.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort report generation entirely.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// Output folder is already present and overwriting was not requested.
    #[error("Output folder '{}' directory already exists - please remove, specify a different folder name or use --overwrite", .0.display())]
    OutputFolderExists(PathBuf),
    /// The Gatling console transcript names the same simulation twice.
    #[error("Gatling results file '{}' contains multiple references to '{name}' - lines {first_line} and {second_line}", .file.display())]
    DuplicateSimulation {
        /// Transcript file.
        file: PathBuf,
        /// Simulation class name.
        name: String,
        /// Line of the first marker (1-based).
        first_line: usize,
        /// Line of the repeated marker (1-based).
        second_line: usize,
    },
    /// Filesystem failure.
    #[error("I/O error on '{}': {source}", .path.display())]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// Malformed JSON input or unserializable output.
    #[error("invalid JSON in '{}': {source}", .path.display())]
    Json {
        /// Path being read or written.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },
    /// Report template does not have the required shape.
    #[error("invalid report template: {0}")]
    Template(String),
    /// Configuration file could not be used.
    #[error("invalid configuration '{}': {message}", .path.display())]
    Config {
        /// Configuration file.
        path: PathBuf,
        /// What went wrong.
        message: String,
    },
}

impl GenerateError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }
}

/// Non-fatal problems, recorded in order and reported at the end of a run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordedError {
    /// No `RUN` line supplied a simulation name.
    #[error("Simulation name not found within '{}'", .0.display())]
    MissingName(PathBuf),
    /// No `RUN` line supplied a simulation id; the name is used instead.
    #[error("Simulation id not found within '{}' (using name)", .0.display())]
    MissingId(PathBuf),
    /// No usable start timestamp.
    #[error("Simulation start time not found within '{}'", .0.display())]
    MissingStart(PathBuf),
    /// No usable end timestamp.
    #[error("Simulation end time not found within '{}'", .0.display())]
    MissingEnd(PathBuf),
    /// Simulation name lacks the `_PROJECT_ID` suffix.
    #[error("Simulation name '{name}' does not contain Jira ticket reference")]
    NoTicketReference {
        /// Simulation class name.
        name: String,
    },
    /// Ticket project is not on the allow-list.
    #[error("Simulation name '{name}' references Jira ticket '{key}' but project '{project}' is not a valid Jira project ({})", json_list(.allowed))]
    InvalidProject {
        /// Simulation class name.
        name: String,
        /// Ticket key.
        key: String,
        /// Project code.
        project: String,
        /// Allow-list in force.
        allowed: Vec<String>,
    },
    /// Ticket key already claimed by another simulation in this run.
    #[error("Simulation name '{name}' references Jira ticket '{key}' which has also been referenced by {claimed_by}")]
    DuplicateTicket {
        /// Simulation class name.
        name: String,
        /// Ticket key.
        key: String,
        /// Simulation holding the claim.
        claimed_by: String,
    },
    /// A report file for this id is already present.
    #[error("Unable to create Cucumber JSON report file '{}' for '{name}' as file already exists", .path.display())]
    ReportExists {
        /// Target report path.
        path: PathBuf,
        /// Simulation class name.
        name: String,
    },
    /// Results folder has no `simulation.log`.
    #[error("Simulation log file '{}' does not exist", .0.display())]
    MissingSimulationLog(PathBuf),
    /// Results folder has no `js/assertions.json`.
    #[error("Assertions JSON file '{}' does not exist", .0.display())]
    MissingAssertions(PathBuf),
    /// Event log and assertions disagree on the simulation name.
    #[error("Simulation name '{}' within '{}' does not match '{}' within '{}'", display_name(.log_name.as_deref()), .log_file.display(), display_name(.assertions_name.as_deref()), .assertions_file.display())]
    NameMismatch {
        /// Name from the event log, if any.
        log_name: Option<String>,
        /// Event log path.
        log_file: PathBuf,
        /// Name from the assertions file, if any.
        assertions_name: Option<String>,
        /// Assertions file path.
        assertions_file: PathBuf,
    },
    /// `js/assertions.json` is not valid JSON or lacks the `assertions` list.
    #[error("Assertions JSON file '{}' could not be read: {message}", .path.display())]
    InvalidAssertions {
        /// Assertions file path.
        path: PathBuf,
        /// Parser message.
        message: String,
    },
    /// Transcript mode is active but holds no block for this simulation.
    #[error("Log details for '{0}' do not exist")]
    MissingLogDetails(String),
    /// Results folder has no simulation sub-folders.
    #[error("Gatling results folder '{}' contains no child folders", .0.display())]
    NoChildFolders(PathBuf),
}

/// A value produced together with the non-fatal errors met while producing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recorded<T> {
    /// Best-effort result.
    pub value: T,
    /// Errors in the order they were met.
    pub errors: Vec<RecordedError>,
}

impl<T> Recorded<T> {
    /// Wraps a value with no errors.
    #[must_use]
    pub const fn clean(value: T) -> Self {
        Self {
            value,
            errors: Vec::new(),
        }
    }

    /// Wraps a value with the given errors.
    #[must_use]
    pub const fn with_errors(value: T, errors: Vec<RecordedError>) -> Self {
        Self { value, errors }
    }
}

fn json_list(values: &[String]) -> String {
    serde_json::to_string(values).unwrap_or_default()
}

fn display_name(name: Option<&str>) -> &str {
    name.unwrap_or("undefined")
}
