use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use gatling_cucumber_report::{
    generate_cucumber_json, GenerateOptions, GeneratorConfig, ReportTelemetry,
};
use serde_json::json;
use shared_logging::LogLevel;

#[derive(Parser, Debug)]
#[command(
    name = "gatling-cucumber-json",
    version,
    about = "Generates Cucumber JSON reports for Jira Xray from Gatling results"
)]
struct Cli {
    /// Gatling console output; each simulation's block is attached as evidence.
    #[arg(long)]
    gatling_results_file: Option<PathBuf>,
    /// Folder holding one results folder per simulation [default: ./target/gatling].
    #[arg(long)]
    gatling_results_folder: Option<PathBuf>,
    /// Folder the reports are written into [default: ./gatling-cucumber-reports].
    #[arg(long)]
    output_folder: Option<PathBuf>,
    /// Delete the output folder first if it already exists.
    #[arg(long)]
    overwrite: bool,
    /// TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Append JSON-lines logs to this file.
    #[arg(long)]
    log_file: Option<PathBuf>,
    /// Allowed Jira project code; repeat to allow several. Replaces the configured list.
    #[arg(long = "valid-project", value_name = "CODE")]
    valid_projects: Vec<String>,
    /// Do not echo progress to the console.
    #[arg(long)]
    quiet: bool,
}

impl Cli {
    fn config(&self) -> Result<GeneratorConfig> {
        let config = match &self.config {
            Some(path) => GeneratorConfig::load(path)
                .with_context(|| format!("loading configuration {}", path.display()))?,
            None => GeneratorConfig::builtin()?,
        };
        if self.valid_projects.is_empty() {
            Ok(config)
        } else {
            Ok(config.with_valid_projects(self.valid_projects.clone()))
        }
    }

    fn options(&self, config: &GeneratorConfig) -> GenerateOptions {
        let defaults = config.options();
        GenerateOptions {
            results_file: self.gatling_results_file.clone(),
            results_folder: self
                .gatling_results_folder
                .clone()
                .unwrap_or(defaults.results_folder),
            output_folder: self.output_folder.clone().unwrap_or(defaults.output_folder),
            overwrite: self.overwrite,
        }
    }

    fn telemetry(&self, config: &GeneratorConfig) -> Result<ReportTelemetry> {
        let mut builder = ReportTelemetry::builder("gatling-cucumber-json").console(!self.quiet);
        if let Some(path) = self.log_file.as_ref().or(config.log_file.as_ref()) {
            builder = builder.log_path(path);
        }
        builder.build().context("initialising logging")
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.config()?;
    let options = cli.options(&config);
    let telemetry = cli.telemetry(&config)?;
    telemetry.log(
        LogLevel::Debug,
        format!(
            "Processing Gatling results folder '{}'",
            options.results_folder.display()
        ),
        &json!({
            "results_file": options.results_file,
            "results_folder": options.results_folder,
            "output_folder": options.output_folder,
            "overwrite": options.overwrite,
            "valid_projects": config.valid_projects,
        }),
    );

    match generate_cucumber_json(&options, config, telemetry.clone()) {
        Ok(outcome) if outcome.successful => Ok(()),
        Ok(_) => std::process::exit(1),
        Err(err) => {
            telemetry.fail(err.to_string(), &json!({ "fatal": true }));
            std::process::exit(1)
        }
    }
}
