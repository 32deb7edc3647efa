#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Gatling results to Cucumber JSON for Jira Xray.
//!
//! Each child folder of a Gatling results folder holds one simulation's
//! `simulation.log` and `js/assertions.json`. [`Generator`] turns every such
//! folder into `<id>.json`, tags it with the Jira ticket encoded in the
//! simulation class name and attaches the raw artifacts as evidence.

/// Assertions input and verdicts.
pub mod assertions;
/// Configuration and per-run options.
pub mod config;
/// Cucumber JSON document model.
pub mod cucumber;
/// Base64 evidence attachments.
pub mod embed;
/// Fatal and recorded errors.
pub mod error;
/// Run orchestration.
pub mod generate;
/// Jira ticket references.
pub mod jira;
/// Transcript and event-log parsing.
pub mod parser;
/// Report synthesis.
pub mod report;
/// Logging facade.
pub mod telemetry;

pub use config::{GenerateOptions, GeneratorConfig};
pub use error::{GenerateError, Recorded, RecordedError};
pub use generate::{generate_cucumber_json, AggregateOutcome, Generator, RunSummary};
pub use report::ReportOutcome;
pub use telemetry::{ReportTelemetry, ReportTelemetryBuilder};
