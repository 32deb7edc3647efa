//! Jira Xray ticket references carried in simulation class names.
//!
//! A class named `performance.PostsScenario_ABC_42` refers to ticket `ABC-42`.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::RecordedError;

static TICKET_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"_([A-Z][A-Z0-9]+)_(\d+)$").expect("valid ticket pattern"));

/// Ticket reference derived from a simulation name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JiraIssueRef {
    /// Project code, e.g. `ABC`.
    pub project: String,
    /// Issue number within the project.
    pub id: u64,
    /// `PROJECT-ID`.
    pub key: String,
}

impl JiraIssueRef {
    /// Extracts the ticket from a name ending in `_PROJECT_ID`.
    #[must_use]
    pub fn from_simulation_name(name: &str) -> Option<Self> {
        let captures = TICKET_SUFFIX.captures(name)?;
        let project = captures[1].to_string();
        let id: u64 = captures[2].parse().ok()?;
        Some(Self {
            key: format!("{project}-{id}"),
            project,
            id,
        })
    }

    /// Tag applied to the Cucumber scenario.
    #[must_use]
    pub fn tag(&self) -> String {
        format!("@{}", self.key)
    }
}

/// Ticket keys claimed during one run, with the allow-list of projects.
///
/// The first simulation to claim a key keeps it; the same simulation may
/// claim its own key again.
#[derive(Debug, Clone)]
pub struct TicketRegistry {
    valid_projects: Vec<String>,
    claims: IndexMap<String, String>,
}

impl TicketRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new(valid_projects: Vec<String>) -> Self {
        Self {
            valid_projects,
            claims: IndexMap::new(),
        }
    }

    /// Derives the ticket for a simulation and applies the naming policy.
    ///
    /// Returns the ticket whenever the name matches, even when it is rejected,
    /// so the report can still be tagged with it.
    pub fn claim(&mut self, simulation: &str) -> (Option<JiraIssueRef>, Vec<RecordedError>) {
        let Some(issue) = JiraIssueRef::from_simulation_name(simulation) else {
            return (
                None,
                vec![RecordedError::NoTicketReference {
                    name: simulation.to_string(),
                }],
            );
        };

        if !self.valid_projects.contains(&issue.project) {
            let err = RecordedError::InvalidProject {
                name: simulation.to_string(),
                key: issue.key.clone(),
                project: issue.project.clone(),
                allowed: self.valid_projects.clone(),
            };
            return (Some(issue), vec![err]);
        }

        if let Some(claimed_by) = self
            .claims
            .get(&issue.key)
            .filter(|claimed_by| claimed_by.as_str() != simulation)
        {
            let err = RecordedError::DuplicateTicket {
                name: simulation.to_string(),
                key: issue.key.clone(),
                claimed_by: claimed_by.clone(),
            };
            return (Some(issue), vec![err]);
        }

        self.claims
            .entry(issue.key.clone())
            .or_insert_with(|| simulation.to_string());
        (Some(issue), Vec::new())
    }

    /// Simulation holding the given key, if any.
    #[must_use]
    pub fn claimed_by(&self, key: &str) -> Option<&str> {
        self.claims.get(key).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_project_and_number() {
        let issue = JiraIssueRef::from_simulation_name("performance.FooScenario_ABC_42").unwrap();
        assert_eq!(issue.project, "ABC");
        assert_eq!(issue.id, 42);
        assert_eq!(issue.key, "ABC-42");
        assert_eq!(issue.tag(), "@ABC-42");
    }

    #[test]
    fn leading_zeros_are_dropped_from_key() {
        let issue = JiraIssueRef::from_simulation_name("perf.Scenario_P2_007").unwrap();
        assert_eq!(issue.key, "P2-7");
    }

    #[test]
    fn names_without_suffix_do_not_match() {
        for name in [
            "performance.ExamplesScenario",
            "perf.Scenario_A_1",
            "perf.Scenario_abc_1",
            "perf.Scenario_ABC_1x",
            "perf.Scenario_1BC_1",
        ] {
            assert_eq!(JiraIssueRef::from_simulation_name(name), None, "{name}");
        }
    }

    #[test]
    fn registry_applies_policy() {
        let mut registry = TicketRegistry::new(vec!["ABC".into()]);

        let (issue, errors) = registry.claim("perf.Plain");
        assert!(issue.is_none());
        assert_eq!(errors[0].to_string(), "Simulation name 'perf.Plain' does not contain Jira ticket reference");

        let (issue, errors) = registry.claim("perf.Other_XYZ_1");
        assert_eq!(issue.unwrap().key, "XYZ-1");
        assert!(matches!(errors[0], RecordedError::InvalidProject { .. }));
        assert_eq!(registry.claimed_by("XYZ-1"), None);

        let (_, errors) = registry.claim("perf.First_ABC_5");
        assert!(errors.is_empty());
        let (issue, errors) = registry.claim("perf.Second_ABC_5");
        assert_eq!(issue.unwrap().tag(), "@ABC-5");
        assert_eq!(
            errors,
            vec![RecordedError::DuplicateTicket {
                name: "perf.Second_ABC_5".into(),
                key: "ABC-5".into(),
                claimed_by: "perf.First_ABC_5".into(),
            }]
        );
        assert_eq!(registry.claimed_by("ABC-5"), Some("perf.First_ABC_5"));

        let (_, errors) = registry.claim("perf.First_ABC_5");
        assert!(errors.is_empty());
    }
}
