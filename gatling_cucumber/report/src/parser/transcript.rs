//! Gatling console output split into one block per simulation.

use std::{fs, path::Path};

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;

use crate::{error::GenerateError, telemetry::ReportTelemetry};

use super::split_lines;

static SIMULATION_STARTED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Simulation (.+) started\.\.\.$").expect("valid marker pattern"));

/// Console output belonging to one simulation, from its start marker up to
/// the next marker or end of input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationTranscriptBlock {
    /// Simulation class name captured from the marker.
    pub name: String,
    /// 1-based line number of the marker.
    pub start_line: usize,
    /// Marker line followed by every line up to the next marker.
    pub lines: Vec<String>,
}

/// Transcript blocks keyed by simulation name, in transcript order.
#[derive(Debug, Clone, Default)]
pub struct TranscriptIndex {
    blocks: IndexMap<String, SimulationTranscriptBlock>,
}

impl TranscriptIndex {
    /// Reads and parses a transcript file.
    pub fn load(path: impl AsRef<Path>, telemetry: &ReportTelemetry) -> Result<Self, GenerateError> {
        let path = path.as_ref();
        telemetry.detail(format!("Processing Gatling results file '{}'", path.display()));
        let text = fs::read_to_string(path).map_err(|err| GenerateError::io(path, err))?;
        parse_transcript(path, &text, telemetry)
    }

    /// Block for the given simulation, if the transcript mentioned it.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&SimulationTranscriptBlock> {
        self.blocks.get(name)
    }

    /// Number of simulations found.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Whether no simulation markers were found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Simulation names in transcript order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.blocks.keys().map(String::as_str)
    }
}

/// Splits transcript text into per-simulation blocks.
///
/// Lines before the first `Simulation <name> started...` marker are dropped.
/// A name seen twice fails the whole parse.
pub fn parse_transcript(
    file: impl AsRef<Path>,
    text: &str,
    telemetry: &ReportTelemetry,
) -> Result<TranscriptIndex, GenerateError> {
    let file = file.as_ref().to_path_buf();
    let mut blocks: IndexMap<String, SimulationTranscriptBlock> = IndexMap::new();
    let mut current: Option<SimulationTranscriptBlock> = None;

    for (index, line) in split_lines(text).into_iter().enumerate() {
        let line_number = index + 1;
        let marker = SIMULATION_STARTED
            .captures(&line)
            .map(|captures| captures[1].to_string());
        let Some(name) = marker else {
            if let Some(block) = current.as_mut() {
                block.lines.push(line);
            }
            continue;
        };
        if let Some(block) = current.take() {
            blocks.insert(block.name.clone(), block);
        }
        if let Some(existing) = blocks.get(&name) {
            return Err(GenerateError::DuplicateSimulation {
                file,
                name,
                first_line: existing.start_line,
                second_line: line_number,
            });
        }
        telemetry.log(
            shared_logging::LogLevel::Debug,
            format!("Found start of simulation '{name}' at line number {line_number}"),
            &json!({ "simulation": name, "line": line_number }),
        );
        current = Some(SimulationTranscriptBlock {
            name,
            start_line: line_number,
            lines: vec![line],
        });
    }

    if let Some(block) = current {
        blocks.insert(block.name.clone(), block);
    }

    telemetry.detail(format!(
        "Gatling results file '{}' contained information for {} simulations",
        file.display(),
        blocks.len()
    ));

    Ok(TranscriptIndex { blocks })
}
