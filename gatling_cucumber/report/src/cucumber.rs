//! Cucumber JSON document model and the report template it is cloned from.

use std::{fs, path::Path};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{embed::Embedding, error::GenerateError};

const BUILTIN_TEMPLATE: &str = include_str!("../resources/template.json");

/// Cucumber feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
    /// Gherkin keyword.
    pub keyword: String,
    /// Feature location; set to the simulation name.
    pub uri: String,
    /// Feature id; set to the simulation id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Line in the (virtual) feature file.
    pub line: u32,
    /// Scenarios.
    pub elements: Vec<Scenario>,
    /// Template fields the generator does not touch, written back unchanged.
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

/// Cucumber scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// Gherkin keyword.
    pub keyword: String,
    /// Element type, `scenario`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Scenario id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Line in the (virtual) feature file.
    pub line: u32,
    /// Tags; removed entirely when the simulation has no ticket.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<Tag>>,
    /// Steps.
    pub steps: Vec<Step>,
    /// Template fields the generator does not touch, written back unchanged.
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

/// Scenario tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// Tag text including the leading `@`.
    pub name: String,
    /// Line in the (virtual) feature file.
    pub line: u32,
}

/// Cucumber step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Gherkin keyword.
    pub keyword: String,
    /// Step text.
    pub name: String,
    /// Line in the (virtual) feature file.
    pub line: u32,
    /// Execution outcome.
    pub result: StepResult,
    /// Free text shown under the step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_string: Option<DocString>,
    /// Attached evidence; absent until something is embedded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embeddings: Option<Vec<Embedding>>,
    /// Template fields the generator does not touch, written back unchanged.
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

/// Step outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepResult {
    /// `passed` or `failed`.
    pub status: String,
    /// Duration in nanoseconds.
    #[serde(default)]
    pub duration: i64,
    /// Shown by Xray without expanding the step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Step doc string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocString {
    /// Content type, left empty.
    pub content_type: String,
    /// Text.
    pub value: String,
    /// Line of the owning step.
    pub line: u32,
}

/// A complete report: Cucumber JSON is an array of features.
pub type CucumberReport = Vec<Feature>;

/// Immutable report template; every report starts from a fresh clone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportTemplate {
    features: CucumberReport,
}

impl ReportTemplate {
    /// Template shipped with the crate.
    pub fn builtin() -> Result<Self, GenerateError> {
        Self::parse(BUILTIN_TEMPLATE)
    }

    /// Loads a custom template file.
    pub fn load(path: &Path) -> Result<Self, GenerateError> {
        let text = fs::read_to_string(path).map_err(|err| GenerateError::io(path, err))?;
        Self::parse(&text)
    }

    /// Parses and validates template JSON.
    pub fn parse(text: &str) -> Result<Self, GenerateError> {
        let features: CucumberReport = serde_json::from_str(text)
            .map_err(|err| GenerateError::Template(err.to_string()))?;
        let steps = features
            .first()
            .and_then(|feature| feature.elements.first())
            .map_or(0, |scenario| scenario.steps.len());
        if steps < 2 {
            return Err(GenerateError::Template(
                "expected a feature with a scenario containing at least two steps".into(),
            ));
        }
        Ok(Self { features })
    }

    /// Deep copy ready to be filled in.
    #[must_use]
    pub fn instantiate(&self) -> CucumberReport {
        self.features.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_template_has_two_steps_and_a_tag() {
        let template = ReportTemplate::builtin().unwrap();
        let report = template.instantiate();
        let scenario = &report[0].elements[0];
        assert_eq!(scenario.steps.len(), 2);
        assert_eq!(scenario.tags.as_ref().unwrap().len(), 1);
        assert!(scenario.steps[0].embeddings.is_none());
    }

    #[test]
    fn instances_do_not_share_state() {
        let template = ReportTemplate::builtin().unwrap();
        let mut first = template.instantiate();
        first[0].name = "changed".into();
        first[0].elements[0].tags = None;
        let second = template.instantiate();
        assert_eq!(second[0].name, "");
        assert!(second[0].elements[0].tags.is_some());
        assert_eq!(template, ReportTemplate::builtin().unwrap());
    }

    #[test]
    fn custom_template_keeps_unmodelled_fields() {
        let text = r##"[{"keyword":"Feature","uri":"","id":"","name":"","description":"","line":1,
            "comments":[{"value":"# generated","line":1}],
            "elements":[{"keyword":"Scenario","type":"scenario","id":"","name":"","description":"","line":2,
            "before":[{"result":{"status":"passed","duration":1}}],
            "steps":[{"keyword":"Given ","name":"","line":3,"result":{"status":"passed"},"match":{"location":"perf"}},
                     {"keyword":"Then ","name":"","line":4,"result":{"status":"passed"}}]}]}]"##;
        let report = ReportTemplate::parse(text).unwrap().instantiate();
        assert!(report[0].extra.contains_key("comments"));
        assert!(report[0].elements[0].extra.contains_key("before"));
        assert!(report[0].elements[0].steps[1].extra.is_empty());

        let written: Value = serde_json::to_value(&report).unwrap();
        assert_eq!(written[0]["comments"][0]["value"], "# generated");
        assert_eq!(written[0]["elements"][0]["before"][0]["result"]["duration"], 1);
        assert_eq!(written[0]["elements"][0]["steps"][0]["match"]["location"], "perf");
    }

    #[test]
    fn rejects_template_without_two_steps() {
        let text = r#"[{"keyword":"Feature","uri":"","id":"","name":"","description":"","line":1,
            "elements":[{"keyword":"Scenario","type":"scenario","id":"","name":"","description":"","line":2,
            "steps":[{"keyword":"Given ","name":"","line":3,"result":{"status":"passed"}}]}]}]"#;
        assert!(matches!(
            ReportTemplate::parse(text),
            Err(GenerateError::Template(_))
        ));
        assert!(matches!(
            ReportTemplate::parse("[]"),
            Err(GenerateError::Template(_))
        ));
    }
}
