//! Builds and writes one Cucumber JSON report per simulation.

use std::{
    fs::OpenOptions,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use serde::Serialize;
use serde_json::{json, ser::PrettyFormatter, Serializer};

use crate::{
    assertions::{integral_floats, AssertionVerdict, AssertionsDocument},
    cucumber::{CucumberReport, DocString, ReportTemplate, Tag},
    embed::{embed, MimeType},
    error::{GenerateError, Recorded, RecordedError},
    jira::{JiraIssueRef, TicketRegistry},
    parser::{PerformanceRun, SimulationTranscriptBlock},
    telemetry::ReportTelemetry,
};

/// Milliseconds to nanoseconds; Cucumber durations are in nanoseconds.
pub const DURATION_FACTOR: i64 = 1_000_000;

/// Tag shown in summaries for simulations without a ticket reference.
pub const TAG_NONE: &str = "<none>";

const INDENT: &[u8] = b"    ";

/// A report that was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportOutcome {
    /// Report file.
    pub path: PathBuf,
    /// Whether the simulation's assertions passed.
    pub passed: bool,
    /// `@KEY` or [`TAG_NONE`].
    pub tag: String,
}

/// Everything known about one simulation.
#[derive(Debug, Clone, Copy)]
pub struct SimulationInput<'a> {
    /// Parsed `simulation.log`.
    pub run: &'a PerformanceRun,
    /// Parsed `js/assertions.json`.
    pub assertions: &'a AssertionsDocument,
    /// Matching transcript block, when transcript mode found one.
    pub log_details: Option<&'a SimulationTranscriptBlock>,
}

/// Report built in memory, before it is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltReport {
    /// Cucumber JSON document.
    pub document: CucumberReport,
    /// Assertion verdict.
    pub verdict: AssertionVerdict,
    /// `@KEY` or [`TAG_NONE`].
    pub tag: String,
}

/// Fills report templates and writes them into the output folder.
#[derive(Debug, Clone)]
pub struct ReportSynthesizer<'a> {
    template: &'a ReportTemplate,
    output_folder: PathBuf,
    telemetry: ReportTelemetry,
}

impl<'a> ReportSynthesizer<'a> {
    /// Creates a synthesizer writing into `output_folder`.
    #[must_use]
    pub fn new(
        template: &'a ReportTemplate,
        output_folder: impl Into<PathBuf>,
        telemetry: ReportTelemetry,
    ) -> Self {
        Self {
            template,
            output_folder: output_folder.into(),
            telemetry,
        }
    }

    /// Report path for a simulation id.
    #[must_use]
    pub fn output_path(&self, id: &str) -> PathBuf {
        self.output_folder.join(format!("{id}.json"))
    }

    /// Applies the ticket policy, builds the report and writes it.
    ///
    /// The outcome is `None` when a report for the same id already exists.
    pub fn synthesize(
        &self,
        input: SimulationInput<'_>,
        registry: &mut TicketRegistry,
    ) -> Result<Recorded<Option<ReportOutcome>>, GenerateError> {
        let name = input.run.name_or_default();
        let (issue, mut errors) = registry.claim(name);
        let built = self.build(input, issue.as_ref())?;

        let path = self.output_path(input.run.id_or_default());
        let outcome = match write_report(&path, &built.document)? {
            WriteStatus::Written => {
                self.telemetry.info(
                    format!(
                        "Created cucumber JSON report '{}' - tag: {} passed: {}",
                        path.display(),
                        built.tag,
                        built.verdict.passed
                    ),
                    &json!({
                        "path": path,
                        "simulation": name,
                        "tag": built.tag,
                        "passed": built.verdict.passed,
                    }),
                );
                Some(ReportOutcome {
                    path,
                    passed: built.verdict.passed,
                    tag: built.tag,
                })
            }
            WriteStatus::AlreadyExists => {
                errors.push(RecordedError::ReportExists {
                    path,
                    name: name.to_string(),
                });
                None
            }
        };
        Ok(Recorded::with_errors(outcome, errors))
    }

    /// Fills a fresh copy of the template for one simulation.
    pub fn build(
        &self,
        input: SimulationInput<'_>,
        issue: Option<&JiraIssueRef>,
    ) -> Result<BuiltReport, GenerateError> {
        let run = input.run;
        let name = run.name_or_default();
        let id = run.id_or_default();
        let mut document = self.template.instantiate();
        let verdict = AssertionVerdict::evaluate(&input.assertions.result.assertions);
        let assertions_json = to_pretty_json(&integral_floats(&input.assertions.raw))
            .map_err(|err| GenerateError::json(self.output_path(id), err))?;

        let feature = &mut document[0];
        feature.name = format!("Gatling simulation '{name}'");
        feature.description.clone_from(&feature.name);
        feature.id = id.to_string();
        feature.uri = name.to_string();
        let feature_name = feature.name.clone();

        let scenario = &mut feature.elements[0];
        scenario.name.clone_from(&feature_name);
        scenario.id = format!("{id};{id}");
        let tag = match issue {
            Some(issue) => {
                let tag = issue.tag();
                let tag_line = scenario.line.saturating_sub(1);
                match scenario.tags.as_mut().and_then(|tags| tags.first_mut()) {
                    Some(first) => first.name.clone_from(&tag),
                    None => {
                        scenario.tags = Some(vec![Tag {
                            name: tag.clone(),
                            line: tag_line,
                        }]);
                    }
                }
                tag
            }
            None => {
                scenario.tags = None;
                TAG_NONE.to_string()
            }
        };

        let execution = &mut scenario.steps[0];
        execution.name = feature_name;
        execution.result.duration = run.elapsed_millis().saturating_mul(DURATION_FACTOR);
        embed(execution, &run.raw_lines.join("\n"), MimeType::Text);
        if let Some(details) = input.log_details {
            embed(execution, &details.lines.join("\n"), MimeType::Text);
        }

        let check = &mut scenario.steps[1];
        check.name = verdict.step_name();
        check.result.status = verdict.status().to_string();
        check.result.error_message = (!verdict.passed).then(|| verdict.message.clone());
        check.doc_string = Some(DocString {
            content_type: String::new(),
            value: verdict.message.clone(),
            line: check.line,
        });
        embed(check, &verdict.message, MimeType::Text);
        embed(check, &assertions_json, MimeType::Json);

        Ok(BuiltReport {
            document,
            verdict,
            tag,
        })
    }
}

enum WriteStatus {
    Written,
    AlreadyExists,
}

/// Writes a new report file; an existing file is left untouched.
fn write_report(path: &Path, document: &CucumberReport) -> Result<WriteStatus, GenerateError> {
    let body = to_pretty_json(document).map_err(|err| GenerateError::json(path, err))?;
    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == ErrorKind::AlreadyExists => return Ok(WriteStatus::AlreadyExists),
        Err(err) => return Err(GenerateError::io(path, err)),
    };
    file.write_all(body.as_bytes())
        .map_err(|err| GenerateError::io(path, err))?;
    Ok(WriteStatus::Written)
}

/// Pretty JSON with four-space indentation.
pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<String> {
    let mut buffer = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut buffer, PrettyFormatter::with_indent(INDENT));
    value.serialize(&mut serializer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cucumber::Feature;
    use serde_json::Value;
    use tempfile::tempdir;

    fn run(name: &str, id: &str, start: Option<u64>, end: Option<u64>) -> PerformanceRun {
        PerformanceRun {
            name: Some(name.into()),
            id: Some(id.into()),
            start_epoch_millis: start,
            end_epoch_millis: end,
            raw_lines: vec![
                format!("RUN\t{name}\t{id}\t100\t \t3.0.2"),
                "USER\tposts\t1\tEND\t100\t200".into(),
            ],
        }
    }

    fn assertions(name: &str, items: &Value) -> AssertionsDocument {
        AssertionsDocument::from_value(json!({ "simulation": name, "assertions": items })).unwrap()
    }

    #[test]
    fn builds_tagged_report_with_evidence() {
        let template = ReportTemplate::builtin().unwrap();
        let synthesizer = ReportSynthesizer::new(&template, "out", ReportTelemetry::disabled());
        let run = run("perf.Example_EXAMPLE_10", "example-10", Some(100), Some(200));
        let doc = assertions(
            "perf.Example_EXAMPLE_10",
            &json!([{ "result": false, "message": "too slow", "actualValue": 1500.0 }]),
        );
        let block = SimulationTranscriptBlock {
            name: "perf.Example_EXAMPLE_10".into(),
            start_line: 1,
            lines: vec!["Simulation perf.Example_EXAMPLE_10 started...".into()],
        };
        let issue = JiraIssueRef::from_simulation_name("perf.Example_EXAMPLE_10");
        let built = synthesizer
            .build(
                SimulationInput {
                    run: &run,
                    assertions: &doc,
                    log_details: Some(&block),
                },
                issue.as_ref(),
            )
            .unwrap();

        assert_eq!(built.tag, "@EXAMPLE-10");
        let feature = &built.document[0];
        assert_eq!(feature.name, "Gatling simulation 'perf.Example_EXAMPLE_10'");
        assert_eq!(feature.id, "example-10");
        let scenario = &feature.elements[0];
        assert_eq!(scenario.tags.as_ref().unwrap()[0].name, "@EXAMPLE-10");

        let execution = &scenario.steps[0];
        assert_eq!(execution.result.duration, 100_000_000);
        let evidence = execution.embeddings.as_ref().unwrap();
        assert_eq!(evidence.len(), 2);
        assert_eq!(evidence[0].decode().unwrap(), run.raw_lines.join("\n"));
        assert_eq!(
            evidence[1].decode().unwrap(),
            "Simulation perf.Example_EXAMPLE_10 started..."
        );

        let check = &scenario.steps[1];
        assert_eq!(check.name, "Assertions (passed: 0 failed: 1)");
        assert_eq!(check.result.status, "failed");
        assert_eq!(
            check.result.error_message.as_deref(),
            Some("FAIL: too slow (actual value: 1500)")
        );
        assert_eq!(check.doc_string.as_ref().unwrap().line, check.line);
        let evidence = check.embeddings.as_ref().unwrap();
        assert_eq!(evidence[1].mime_type, MimeType::Json);
        let embedded = evidence[1].decode().unwrap();
        assert!(embedded.contains("\"actualValue\": 1500\n"));
        let embedded: Value = serde_json::from_str(&embedded).unwrap();
        assert_eq!(embedded["simulation"], doc.raw["simulation"]);
    }

    #[test]
    fn untagged_report_drops_tags_and_passes_without_error_message() {
        let template = ReportTemplate::builtin().unwrap();
        let synthesizer = ReportSynthesizer::new(&template, "out", ReportTelemetry::disabled());
        let run = run("perf.Plain", "plain", Some(100), None);
        let doc = assertions("perf.Plain", &json!([{ "result": true, "message": "ok" }]));
        let built = synthesizer
            .build(
                SimulationInput {
                    run: &run,
                    assertions: &doc,
                    log_details: None,
                },
                None,
            )
            .unwrap();
        assert_eq!(built.tag, TAG_NONE);
        let scenario = &built.document[0].elements[0];
        assert!(scenario.tags.is_none());
        assert_eq!(scenario.steps[0].result.duration, 0);
        assert_eq!(scenario.steps[0].embeddings.as_ref().unwrap().len(), 1);
        assert_eq!(scenario.steps[1].result.status, "passed");
        assert!(scenario.steps[1].result.error_message.is_none());

        let json = to_pretty_json(&built.document).unwrap();
        assert!(!json.contains("\"tags\""));
        assert!(json.starts_with("[\n    {\n        \"keyword\": \"Feature\""));
    }

    #[test]
    fn written_report_round_trips_and_existing_file_is_not_overwritten() {
        let dir = tempdir().unwrap();
        let template = ReportTemplate::builtin().unwrap();
        let synthesizer =
            ReportSynthesizer::new(&template, dir.path(), ReportTelemetry::disabled());
        let mut registry = TicketRegistry::new(vec!["EXAMPLE".into()]);
        let run = run("perf.Example_EXAMPLE_10", "example-10", Some(100), Some(200));
        let doc = assertions("perf.Example_EXAMPLE_10", &json!([]));
        let input = SimulationInput {
            run: &run,
            assertions: &doc,
            log_details: None,
        };

        let first = synthesizer.synthesize(input, &mut registry).unwrap();
        assert!(first.errors.is_empty());
        let outcome = first.value.unwrap();
        assert_eq!(outcome.path, dir.path().join("example-10.json"));
        assert!(!outcome.passed);

        let text = std::fs::read_to_string(&outcome.path).unwrap();
        let parsed: Vec<Feature> = serde_json::from_str(&text).unwrap();
        assert_eq!(to_pretty_json(&parsed).unwrap(), text);
        assert_eq!(
            parsed[0].elements[0].steps[1].result.error_message.as_deref(),
            Some("FAIL: No assertions present!")
        );

        let second = synthesizer.synthesize(input, &mut registry).unwrap();
        assert!(second.value.is_none());
        assert_eq!(
            second.errors,
            vec![RecordedError::ReportExists {
                path: dir.path().join("example-10.json"),
                name: "perf.Example_EXAMPLE_10".into(),
            }]
        );
        assert_eq!(std::fs::read_to_string(&outcome.path).unwrap(), text);
    }
}
