use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::{cucumber::ReportTemplate, error::GenerateError};

/// Folder Gatling writes its per-simulation results into.
pub const DEFAULT_GATLING_RESULTS_FOLDER: &str = "./target/gatling";
/// Folder the Cucumber JSON reports are written into.
pub const DEFAULT_OUTPUT_FOLDER: &str = "./gatling-cucumber-reports";

const BUILTIN_VALID_PROJECTS: &str = include_str!("../resources/valid-jira-projects.json");

/// One report-generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateOptions {
    /// Gatling console transcript; enables transcript correlation.
    pub results_file: Option<PathBuf>,
    /// Folder holding one sub-folder per simulation.
    pub results_folder: PathBuf,
    /// Folder receiving `<id>.json` reports.
    pub output_folder: PathBuf,
    /// Replace an existing output folder.
    pub overwrite: bool,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            results_file: None,
            results_folder: PathBuf::from(DEFAULT_GATLING_RESULTS_FOLDER),
            output_folder: PathBuf::from(DEFAULT_OUTPUT_FOLDER),
            overwrite: false,
        }
    }
}

/// Static configuration: allow-list, default folders, template and log file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// Jira projects a simulation may reference.
    pub valid_projects: Vec<String>,
    /// Default results folder.
    pub results_folder: PathBuf,
    /// Default output folder.
    pub output_folder: PathBuf,
    /// Custom report template, if any.
    pub template: Option<PathBuf>,
    /// JSON-lines log file, if any.
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct GeneratorConfigSerde {
    #[serde(default)]
    valid_projects: Option<Vec<String>>,
    #[serde(default)]
    results_folder: Option<PathBuf>,
    #[serde(default)]
    output_folder: Option<PathBuf>,
    #[serde(default)]
    template: Option<PathBuf>,
    #[serde(default)]
    log_file: Option<PathBuf>,
}

impl GeneratorConfig {
    /// Configuration with the shipped allow-list and default folders.
    pub fn builtin() -> Result<Self, GenerateError> {
        let valid_projects: Vec<String> = serde_json::from_str(BUILTIN_VALID_PROJECTS)
            .map_err(|err| GenerateError::Template(format!("built-in project list: {err}")))?;
        Ok(Self {
            valid_projects,
            results_folder: PathBuf::from(DEFAULT_GATLING_RESULTS_FOLDER),
            output_folder: PathBuf::from(DEFAULT_OUTPUT_FOLDER),
            template: None,
            log_file: None,
        })
    }

    /// Loads a TOML file; unset keys keep their built-in values and relative
    /// paths resolve against the file's directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, GenerateError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|err| GenerateError::io(path, err))?;
        let document: GeneratorConfigSerde =
            toml::from_str(&raw).map_err(|err| GenerateError::Config {
                path: path.to_path_buf(),
                message: err.to_string(),
            })?;
        let source_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let resolve = |candidate: PathBuf| {
            if candidate.is_relative() {
                source_dir.join(candidate)
            } else {
                candidate
            }
        };

        let mut config = Self::builtin()?;
        if let Some(projects) = document.valid_projects {
            config.valid_projects = projects;
        }
        if let Some(folder) = document.results_folder {
            config.results_folder = resolve(folder);
        }
        if let Some(folder) = document.output_folder {
            config.output_folder = resolve(folder);
        }
        config.template = document.template.map(&resolve);
        config.log_file = document.log_file.map(&resolve);
        config.validate(path)?;
        Ok(config)
    }

    /// Replaces the allow-list.
    #[must_use]
    pub fn with_valid_projects(mut self, projects: Vec<String>) -> Self {
        self.valid_projects = projects;
        self
    }

    /// Report template to clone from.
    pub fn report_template(&self) -> Result<ReportTemplate, GenerateError> {
        match &self.template {
            Some(path) => ReportTemplate::load(path),
            None => ReportTemplate::builtin(),
        }
    }

    /// Default request for this configuration.
    #[must_use]
    pub fn options(&self) -> GenerateOptions {
        GenerateOptions {
            results_file: None,
            results_folder: self.results_folder.clone(),
            output_folder: self.output_folder.clone(),
            overwrite: false,
        }
    }

    fn validate(&self, path: &Path) -> Result<(), GenerateError> {
        if self.valid_projects.is_empty() {
            return Err(GenerateError::Config {
                path: path.to_path_buf(),
                message: "valid_projects must list at least one Jira project".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn builtin_config_uses_defaults() {
        let config = GeneratorConfig::builtin().unwrap();
        assert_eq!(config.valid_projects, vec!["EXAMPLE".to_string()]);
        let options = config.options();
        assert_eq!(options.results_folder, PathBuf::from("./target/gatling"));
        assert_eq!(options.output_folder, PathBuf::from("./gatling-cucumber-reports"));
        assert!(!options.overwrite);
        assert_eq!(options, GenerateOptions::default());
    }

    #[test]
    fn loads_and_resolves_relative_paths() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("generator.toml");
        fs::write(
            &config_path,
            r#"
valid_projects = ["ABC", "PERF"]
results_folder = "results"
log_file = "/var/log/generate.jsonl"
"#,
        )
        .unwrap();
        let config = GeneratorConfig::load(&config_path).unwrap();
        assert_eq!(config.valid_projects, vec!["ABC".to_string(), "PERF".to_string()]);
        assert_eq!(config.results_folder, dir.path().join("results"));
        assert_eq!(config.output_folder, PathBuf::from(DEFAULT_OUTPUT_FOLDER));
        assert_eq!(config.log_file, Some(PathBuf::from("/var/log/generate.jsonl")));
        assert!(config.template.is_none());
    }

    #[test]
    fn rejects_empty_allow_list_and_unknown_keys() {
        let dir = tempdir().unwrap();
        let empty = dir.path().join("empty.toml");
        fs::write(&empty, "valid_projects = []\n").unwrap();
        assert!(matches!(
            GeneratorConfig::load(&empty),
            Err(GenerateError::Config { .. })
        ));

        let unknown = dir.path().join("unknown.toml");
        fs::write(&unknown, "valid_project = [\"ABC\"]\n").unwrap();
        assert!(matches!(
            GeneratorConfig::load(&unknown),
            Err(GenerateError::Config { .. })
        ));
    }
}
