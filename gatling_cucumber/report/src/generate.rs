//! Run orchestration: one Cucumber JSON report per Gatling results folder.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use serde::Serialize;
use serde_json::json;

use crate::{
    assertions::AssertionsDocument,
    config::{GenerateOptions, GeneratorConfig},
    cucumber::ReportTemplate,
    error::{GenerateError, Recorded, RecordedError},
    jira::TicketRegistry,
    parser::{event_log::load_event_log, PerformanceRun, SimulationTranscriptBlock, TranscriptIndex},
    report::{ReportOutcome, ReportSynthesizer, SimulationInput, TAG_NONE},
    telemetry::ReportTelemetry,
};

/// Event log file inside each simulation folder.
pub const SIMULATION_LOG: &str = "simulation.log";

/// Counts reported once all folders have been processed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Reports whose assertions passed.
    pub passed: usize,
    /// Reports whose assertions failed.
    pub failed: usize,
    /// Reports without a ticket tag.
    pub untagged: usize,
    /// Recorded errors.
    pub errors: usize,
}

/// Result of a whole run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateOutcome {
    /// Written reports keyed (and therefore sorted) by the path's text.
    pub reports_by_path: BTreeMap<String, ReportOutcome>,
    /// Recorded errors in the order they were met.
    pub errors: Vec<RecordedError>,
    /// Report counts.
    pub summary: RunSummary,
    /// True exactly when no error was recorded, whatever the reports' verdicts.
    pub successful: bool,
}

impl AggregateOutcome {
    /// Error messages, verbatim and in order.
    #[must_use]
    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }
}

/// Ordered error accumulator that echoes each error as it is recorded.
#[derive(Debug)]
struct ErrorLog<'t> {
    errors: Vec<RecordedError>,
    telemetry: &'t ReportTelemetry,
}

impl<'t> ErrorLog<'t> {
    const fn new(telemetry: &'t ReportTelemetry) -> Self {
        Self {
            errors: Vec::new(),
            telemetry,
        }
    }

    fn record(&mut self, error: RecordedError) {
        self.telemetry
            .fail(error.to_string(), &json!({ "kind": "recorded_error" }));
        self.errors.push(error);
    }

    fn absorb<T>(&mut self, recorded: Recorded<T>) -> T {
        for error in recorded.errors {
            self.record(error);
        }
        recorded.value
    }
}

/// Input files of one simulation folder.
#[derive(Debug, Clone, PartialEq, Eq)]
struct BundlePaths {
    simulation_log: PathBuf,
    assertions: PathBuf,
}

/// Drives parsing, ticket policy and report synthesis over a results folder.
#[derive(Debug, Clone)]
pub struct Generator {
    config: GeneratorConfig,
    template: ReportTemplate,
    telemetry: ReportTelemetry,
}

impl Generator {
    /// Creates a generator, loading the configured report template.
    pub fn new(config: GeneratorConfig, telemetry: ReportTelemetry) -> Result<Self, GenerateError> {
        let template = config.report_template()?;
        Ok(Self {
            config,
            template,
            telemetry,
        })
    }

    /// Generates one report per child folder of `options.results_folder`.
    ///
    /// Fails without touching anything when the output folder exists and
    /// `overwrite` is not set, or when the transcript names a simulation twice.
    pub fn generate(&self, options: &GenerateOptions) -> Result<AggregateOutcome, GenerateError> {
        self.prepare_output_folder(options)?;

        let transcript = options
            .results_file
            .as_deref()
            .map(|file| TranscriptIndex::load(file, &self.telemetry))
            .transpose()?;

        let folders = child_folders(&options.results_folder)?;
        self.telemetry.info(
            format!("Creating folder '{}'", options.output_folder.display()),
            &json!({ "path": options.output_folder }),
        );
        fs::create_dir_all(&options.output_folder)
            .map_err(|err| GenerateError::io(&options.output_folder, err))?;

        let mut errors = ErrorLog::new(&self.telemetry);
        let mut reports_by_path = BTreeMap::new();

        if folders.is_empty() {
            errors.record(RecordedError::NoChildFolders(options.results_folder.clone()));
        } else {
            let synthesizer = ReportSynthesizer::new(
                &self.template,
                &options.output_folder,
                self.telemetry.clone(),
            );
            let mut registry = TicketRegistry::new(self.config.valid_projects.clone());
            for folder in &folders {
                if let Some(outcome) = self.process_folder(
                    folder,
                    transcript.as_ref(),
                    &synthesizer,
                    &mut registry,
                    &mut errors,
                )? {
                    reports_by_path.insert(outcome.path.display().to_string(), outcome);
                }
            }
        }

        let errors = errors.errors;
        let summary = summarize(&reports_by_path, errors.len());
        self.log_summary(&reports_by_path, &summary, &errors);

        Ok(AggregateOutcome {
            successful: errors.is_empty(),
            reports_by_path,
            errors,
            summary,
        })
    }

    fn prepare_output_folder(&self, options: &GenerateOptions) -> Result<(), GenerateError> {
        let folder = &options.output_folder;
        if !folder.is_dir() {
            return Ok(());
        }
        if !options.overwrite {
            return Err(GenerateError::OutputFolderExists(folder.clone()));
        }
        self.telemetry.info(
            format!("Deleting folder '{}'", folder.display()),
            &json!({ "path": folder }),
        );
        fs::remove_dir_all(folder).map_err(|err| GenerateError::io(folder, err))
    }

    fn process_folder(
        &self,
        folder: &Path,
        transcript: Option<&TranscriptIndex>,
        synthesizer: &ReportSynthesizer<'_>,
        registry: &mut TicketRegistry,
        errors: &mut ErrorLog<'_>,
    ) -> Result<Option<ReportOutcome>, GenerateError> {
        let paths = match locate_inputs(folder) {
            Ok(paths) => paths,
            Err(err) => {
                errors.record(err);
                return Ok(None);
            }
        };

        let run = errors.absorb(load_event_log(&paths.simulation_log, &self.telemetry)?);
        self.telemetry.detail(format!(
            "Loading assertions file '{}'",
            paths.assertions.display()
        ));
        let assertions = match AssertionsDocument::load(&paths.assertions) {
            Ok(assertions) => assertions,
            Err(GenerateError::Json { path, source }) => {
                errors.record(RecordedError::InvalidAssertions {
                    path,
                    message: source.to_string(),
                });
                return Ok(None);
            }
            Err(err) => return Err(err),
        };

        if let Err(err) = check_simulation_name(&run, &assertions, &paths) {
            errors.record(err);
            return Ok(None);
        }

        let log_details = errors.absorb(lookup_log_details(transcript, run.name_or_default()));

        let recorded = synthesizer.synthesize(
            SimulationInput {
                run: &run,
                assertions: &assertions,
                log_details,
            },
            registry,
        )?;
        Ok(errors.absorb(recorded))
    }

    fn log_summary(
        &self,
        reports: &BTreeMap<String, ReportOutcome>,
        summary: &RunSummary,
        errors: &[RecordedError],
    ) {
        self.telemetry.info(
            format!(
                "The following Cucumber JSON reports were generated ({}):",
                reports.len()
            ),
            &json!({ "count": reports.len() }),
        );
        for (path, report) in reports {
            self.telemetry.detail(format!(
                "    {} Tag: {} Passed: {}",
                path,
                report.tag,
                report.passed
            ));
        }

        let mut status = format!(
            "Passed {} Failed: {} Errors: {}",
            summary.passed, summary.failed, summary.errors
        );
        if summary.untagged > 0 {
            status.push_str(&format!(" No tag defined: {}", summary.untagged));
        }
        self.telemetry.info(status, &json!(summary));

        if !errors.is_empty() {
            let listing: Vec<String> = errors.iter().map(ToString::to_string).collect();
            self.telemetry.fail(
                format!(
                    "The following errors were detected ({}):\n\n    {}",
                    errors.len(),
                    listing.join("\n    ")
                ),
                &json!({ "errors": listing }),
            );
        }
    }
}

/// Convenience wrapper: builds a [`Generator`] and runs it once.
pub fn generate_cucumber_json(
    options: &GenerateOptions,
    config: GeneratorConfig,
    telemetry: ReportTelemetry,
) -> Result<AggregateOutcome, GenerateError> {
    Generator::new(config, telemetry)?.generate(options)
}

/// Immediate sub-folders of `parent`, sorted by path so runs are reproducible.
fn child_folders(parent: &Path) -> Result<Vec<PathBuf>, GenerateError> {
    let entries = fs::read_dir(parent).map_err(|err| GenerateError::io(parent, err))?;
    let mut folders = Vec::new();
    for entry in entries {
        let path = entry.map_err(|err| GenerateError::io(parent, err))?.path();
        if path.is_dir() {
            folders.push(path);
        }
    }
    folders.sort();
    Ok(folders)
}

fn locate_inputs(folder: &Path) -> Result<BundlePaths, RecordedError> {
    let simulation_log = folder.join(SIMULATION_LOG);
    let assertions = folder.join("js").join("assertions.json");
    if !simulation_log.exists() {
        return Err(RecordedError::MissingSimulationLog(simulation_log));
    }
    if !assertions.exists() {
        return Err(RecordedError::MissingAssertions(assertions));
    }
    Ok(BundlePaths {
        simulation_log,
        assertions,
    })
}

fn check_simulation_name(
    run: &PerformanceRun,
    assertions: &AssertionsDocument,
    paths: &BundlePaths,
) -> Result<(), RecordedError> {
    if run.name.as_deref() == assertions.simulation() {
        return Ok(());
    }
    Err(RecordedError::NameMismatch {
        log_name: run.name.clone(),
        log_file: paths.simulation_log.clone(),
        assertions_name: assertions.simulation().map(ToString::to_string),
        assertions_file: paths.assertions.clone(),
    })
}

fn lookup_log_details<'a>(
    transcript: Option<&'a TranscriptIndex>,
    name: &str,
) -> Recorded<Option<&'a SimulationTranscriptBlock>> {
    match transcript {
        None => Recorded::clean(None),
        Some(index) => match index.get(name) {
            Some(block) => Recorded::clean(Some(block)),
            None => Recorded::with_errors(
                None,
                vec![RecordedError::MissingLogDetails(name.to_string())],
            ),
        },
    }
}

fn summarize(reports: &BTreeMap<String, ReportOutcome>, errors: usize) -> RunSummary {
    let mut summary = RunSummary {
        errors,
        ..RunSummary::default()
    };
    for report in reports.values() {
        if report.passed {
            summary.passed += 1;
        } else {
            summary.failed += 1;
        }
        if report.tag == TAG_NONE {
            summary.untagged += 1;
        }
    }
    summary
}
