//! Gatling `js/assertions.json` input and the pass/fail verdict derived from it.

use std::{fs, path::Path};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::GenerateError;

/// Message used when a simulation defines no assertions at all.
pub const NO_ASSERTIONS_MESSAGE: &str = "FAIL: No assertions present!";

/// One Gatling assertion outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assertion {
    /// Whether the assertion held.
    pub result: bool,
    /// Gatling's description of the assertion.
    pub message: String,
    /// Observed value, when Gatling reported one (may be JSON `null`).
    #[serde(
        rename = "actualValue",
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub actual_value: Option<Value>,
}

/// The fields of `assertions.json` the generator reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssertionResult {
    /// Simulation class name; absent in malformed files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simulation: Option<String>,
    /// Assertions in file order.
    pub assertions: Vec<Assertion>,
}

/// An assertions file: the typed view plus the document exactly as loaded, so
/// evidence can embed every field in its original order.
#[derive(Debug, Clone, PartialEq)]
pub struct AssertionsDocument {
    /// Typed view.
    pub result: AssertionResult,
    /// Original JSON document.
    pub raw: Value,
}

impl AssertionsDocument {
    /// Builds a document from an already parsed JSON value.
    pub fn from_value(raw: Value) -> Result<Self, serde_json::Error> {
        let result = AssertionResult::deserialize(&raw)?;
        Ok(Self { result, raw })
    }

    /// Reads `js/assertions.json`.
    pub fn load(path: &Path) -> Result<Self, GenerateError> {
        let text = fs::read_to_string(path).map_err(|err| GenerateError::io(path, err))?;
        let raw: Value =
            serde_json::from_str(&text).map_err(|err| GenerateError::json(path, err))?;
        Self::from_value(raw).map_err(|err| GenerateError::json(path, err))
    }

    /// Simulation name declared by the file.
    #[must_use]
    pub fn simulation(&self) -> Option<&str> {
        self.result.simulation.as_deref()
    }
}

/// Combined outcome of a simulation's assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionVerdict {
    /// True only when at least one assertion exists and all of them passed.
    pub passed: bool,
    /// One `PASS: ...` / `FAIL: ...` line per assertion.
    pub message: String,
    /// Assertions that held.
    pub passed_count: usize,
    /// Assertions that failed (an empty list counts as one failure).
    pub failed_count: usize,
}

impl AssertionVerdict {
    /// Evaluates assertions in order.
    #[must_use]
    pub fn evaluate(assertions: &[Assertion]) -> Self {
        if assertions.is_empty() {
            return Self {
                passed: false,
                message: NO_ASSERTIONS_MESSAGE.to_string(),
                passed_count: 0,
                failed_count: 1,
            };
        }

        let mut lines = Vec::with_capacity(assertions.len());
        let mut passed_count = 0;
        let mut failed_count = 0;
        for assertion in assertions {
            let status = if assertion.result {
                passed_count += 1;
                "PASS"
            } else {
                failed_count += 1;
                "FAIL"
            };
            let mut line = format!("{status}: {}", assertion.message);
            if let Some(actual) = &assertion.actual_value {
                line.push_str(&format!(" (actual value: {})", integral_floats(actual)));
            }
            lines.push(line);
        }

        Self {
            passed: failed_count == 0,
            message: lines.join("\n"),
            passed_count,
            failed_count,
        }
    }

    /// Name of the assertions step.
    #[must_use]
    pub fn step_name(&self) -> String {
        format!(
            "Assertions (passed: {} failed: {})",
            self.passed_count, self.failed_count
        )
    }

    /// Cucumber step status.
    #[must_use]
    pub const fn status(&self) -> &'static str {
        if self.passed {
            "passed"
        } else {
            "failed"
        }
    }
}

/// Largest magnitude at which every integer is exactly representable as `f64`.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Rewrites whole-number floats as integers, so `1000.0` renders as `1000`.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn integral_floats(value: &Value) -> Value {
    match value {
        Value::Number(number) if !number.is_i64() && !number.is_u64() => number
            .as_f64()
            .filter(|f| f.fract() == 0.0 && f.abs() <= MAX_SAFE_INTEGER)
            .map_or_else(|| value.clone(), |f| Value::from(f as i64)),
        Value::Array(items) => Value::Array(items.iter().map(integral_floats).collect()),
        Value::Object(fields) => Value::Object(
            fields
                .iter()
                .map(|(key, field)| (key.clone(), integral_floats(field)))
                .collect(),
        ),
        _ => value.clone(),
    }
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}
