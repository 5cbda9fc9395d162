//! Creates parsed epics and stories through an [`IssueTracker`]
//!
//! Failures are per item: an epic that cannot be created takes its stories
//! with it, but never stops the rest of the run.
//!
//! [`IssueTracker`]: ../jira/trait.IssueTracker.html
use crate::jira::{self, IssueTracker, JiraError, ProjectInfo, DEFAULT_ISSUE_TYPES};
use crate::{Config, Epic};
use tracing::{error, info, warn};

/// A story that made it into Jira
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedStory {
    pub key: String,

    /// False if the story exists but could not be moved into its epic
    pub linked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryOutcome {
    pub title: String,
    pub result: Result<CreatedStory, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpicOutcome {
    pub title: String,

    /// The created epic's key, or why it could not be created
    pub key: Result<String, String>,

    /// Empty when the epic itself failed
    pub stories: Vec<StoryOutcome>,
}

impl EpicOutcome {
    pub fn created_story_keys(&self) -> Vec<&str> {
        self.stories
            .iter()
            .filter_map(|s| s.result.as_ref().ok())
            .map(|s| s.key.as_str())
            .collect()
    }
}

/// Everything a submission run did, in input order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionReport {
    pub epics: Vec<EpicOutcome>,
}

impl SubmissionReport {
    pub fn created_epics(&self) -> usize {
        self.epics.iter().filter(|e| e.key.is_ok()).count()
    }

    pub fn created_stories(&self) -> usize {
        self.epics
            .iter()
            .map(|e| e.created_story_keys().len())
            .sum()
    }

    /// Number of epics and stories that could not be created
    pub fn failures(&self) -> usize {
        self.epics
            .iter()
            .map(|e| {
                let epic = usize::from(e.key.is_err());
                epic + e.stories.iter().filter(|s| s.result.is_err()).count()
            })
            .sum()
    }

    /// Number of created stories left outside their epic
    pub fn unlinked(&self) -> usize {
        self.epics
            .iter()
            .flat_map(|e| e.stories.iter())
            .filter(|s| matches!(&s.result, Ok(created) if !created.linked))
            .count()
    }
}

/// Fetches the configured project, confirming the credentials work
pub fn connect<T: IssueTracker + ?Sized>(
    tracker: &T,
    config: &Config,
) -> Result<ProjectInfo, JiraError> {
    let project = tracker.project(&config.jira.project_key)?;
    info!(key = %project.key, name = %project.name, "connected to Jira project");
    Ok(project)
}

/// Issue types of the project, or a common default set if they cannot be
/// listed
pub fn issue_types<T: IssueTracker + ?Sized>(tracker: &T, project_key: &str) -> Vec<String> {
    match tracker.project(project_key) {
        Ok(project) if !project.issue_types.is_empty() => project.issue_type_names(),
        Ok(_) => default_issue_types(),
        Err(e) => {
            warn!("could not fetch issue types: {}", e);
            default_issue_types()
        }
    }
}

fn default_issue_types() -> Vec<String> {
    DEFAULT_ISSUE_TYPES.iter().map(|t| t.to_string()).collect()
}

/// Creates every epic, then each of its stories linked to it
pub fn submit<T: IssueTracker + ?Sized>(
    tracker: &T,
    epics: &[Epic],
    config: &Config,
) -> SubmissionReport {
    let project_key = config.jira.project_key.as_str();
    let mut report = SubmissionReport::default();

    info!(epics = epics.len(), "creating epics with their stories");
    for (idx, epic) in epics.iter().enumerate() {
        info!("[{}/{}] processing epic: {}", idx + 1, epics.len(), epic.title);

        let fields = jira::epic_fields(epic, project_key, &config.stories);
        let epic_key = match tracker.create_issue(&fields) {
            Ok(key) => {
                info!(key = %key, "created epic: {}", epic.title);
                key
            }
            Err(e) => {
                error!("failed to create epic '{}': {}", epic.title, e);
                report.epics.push(EpicOutcome {
                    title: epic.title.clone(),
                    key: Err(e.to_string()),
                    stories: Vec::new(),
                });
                continue;
            }
        };

        let stories = epic
            .stories
            .iter()
            .map(|story| {
                let fields =
                    jira::story_fields(story, project_key, &config.stories, &config.priorities);
                let result = tracker
                    .create_issue(&fields)
                    .map(|key| {
                        let linked = link(tracker, &epic_key, &key);
                        CreatedStory { key, linked }
                    })
                    .map_err(|e| {
                        error!("failed to create story '{}': {}", story.title, e);
                        e.to_string()
                    });
                StoryOutcome {
                    title: story.title.clone(),
                    result,
                }
            })
            .collect();

        let outcome = EpicOutcome {
            title: epic.title.clone(),
            key: Ok(epic_key),
            stories,
        };
        info!(
            "epic created with {} of {} stories",
            outcome.created_story_keys().len(),
            epic.stories.len()
        );
        report.epics.push(outcome);
    }

    report
}

fn link<T: IssueTracker + ?Sized>(tracker: &T, epic_key: &str, story_key: &str) -> bool {
    match tracker.add_to_epic(epic_key, &[story_key.to_string()]) {
        Ok(()) => {
            info!("created story {} (linked to {})", story_key, epic_key);
            true
        }
        Err(e) => {
            warn!("created story {} but epic link failed: {}", story_key, e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CliConfig, ConfigFile, EnvOverrides};
    use crate::parser;
    use serde_json::Value;
    use std::cell::RefCell;

    /// Records calls and fails on request
    #[derive(Default)]
    struct FakeTracker {
        fail_summaries: Vec<String>,
        fail_links: bool,
        created: RefCell<Vec<Value>>,
        links: RefCell<Vec<(String, Vec<String>)>>,
    }

    impl IssueTracker for FakeTracker {
        fn project(&self, key: &str) -> Result<ProjectInfo, JiraError> {
            if key == "NOPE" {
                return Err(JiraError::Status {
                    status: 404,
                    message: "No project could be found with key 'NOPE'.".to_string(),
                });
            }
            Ok(serde_json::from_value(serde_json::json!({
                "key": key,
                "name": "Fake project",
            }))
            .unwrap())
        }

        fn create_issue(&self, fields: &Value) -> Result<String, JiraError> {
            let summary = fields["summary"].as_str().unwrap_or_default();
            if self.fail_summaries.iter().any(|s| s == summary) {
                return Err(JiraError::Status {
                    status: 400,
                    message: format!("cannot create {}", summary),
                });
            }
            let mut created = self.created.borrow_mut();
            created.push(fields.clone());
            Ok(format!("ACME-{}", created.len()))
        }

        fn add_to_epic(&self, epic_key: &str, issue_keys: &[String]) -> Result<(), JiraError> {
            if self.fail_links {
                return Err(JiraError::UnexpectedResponse("no agile API".to_string()));
            }
            self.links
                .borrow_mut()
                .push((epic_key.to_string(), issue_keys.to_vec()));
            Ok(())
        }
    }

    fn config() -> Config {
        let env = EnvOverrides {
            project_key: Some("ACME".to_string()),
            ..EnvOverrides::default()
        };
        let cli = CliConfig::try_from_args(["jira-stories", "create"]).unwrap();
        Config::layer("config.json".into(), ConfigFile::default(), env, cli)
    }

    const DOC: &str = "EPIC: Export
- As a user I want to export data, so I can share it. [High] {5}
- As a user I want to import data, so I can restore it.
EPIC: Search
- As a user I want to search, so I find things. [Critical]
";

    #[test]
    fn creates_everything_in_order() {
        let tracker = FakeTracker::default();
        let epics = parser::parse_str(DOC);
        let report = submit(&tracker, &epics, &config());

        assert_eq!(report.created_epics(), 2);
        assert_eq!(report.created_stories(), 3);
        assert_eq!(report.failures(), 0);
        assert_eq!(report.unlinked(), 0);

        assert_eq!(report.epics[0].key.as_deref(), Ok("ACME-1"));
        assert_eq!(report.epics[0].created_story_keys(), vec!["ACME-2", "ACME-3"]);
        assert_eq!(report.epics[1].key.as_deref(), Ok("ACME-4"));

        let created = tracker.created.borrow();
        assert_eq!(created[0]["summary"], "Export");
        assert_eq!(created[0]["issuetype"]["name"], "Epic");
        assert_eq!(created[1]["summary"], "Export data");
        assert_eq!(created[1]["priority"]["name"], "High");
        assert_eq!(created[1]["project"]["key"], "ACME");
        assert_eq!(created[4]["priority"]["name"], "Highest");

        let links = tracker.links.borrow();
        assert_eq!(links.len(), 3);
        assert_eq!(links[0], ("ACME-1".to_string(), vec!["ACME-2".to_string()]));
        assert_eq!(links[2], ("ACME-4".to_string(), vec!["ACME-5".to_string()]));
    }

    #[test]
    fn failed_epic_skips_its_stories_only() {
        let tracker = FakeTracker {
            fail_summaries: vec!["Export".to_string()],
            ..FakeTracker::default()
        };
        let epics = parser::parse_str(DOC);
        let report = submit(&tracker, &epics, &config());

        assert_eq!(report.epics.len(), 2);
        assert!(report.epics[0].key.is_err());
        assert!(report.epics[0].stories.is_empty());
        assert_eq!(report.created_epics(), 1);
        assert_eq!(report.created_stories(), 1);
        assert_eq!(report.failures(), 1);
    }

    #[test]
    fn failed_story_does_not_stop_the_epic() {
        let tracker = FakeTracker {
            fail_summaries: vec!["Export data".to_string()],
            ..FakeTracker::default()
        };
        let report = submit(&tracker, &parser::parse_str(DOC), &config());

        assert_eq!(report.created_epics(), 2);
        assert_eq!(report.created_stories(), 2);
        assert_eq!(report.failures(), 1);
        let first = &report.epics[0].stories[0];
        assert_eq!(first.title, "Export data");
        assert_eq!(
            first.result,
            Err("Jira returned HTTP 400: cannot create Export data".to_string())
        );
    }

    #[test]
    fn failed_link_still_counts_the_story() {
        let tracker = FakeTracker {
            fail_links: true,
            ..FakeTracker::default()
        };
        let report = submit(&tracker, &parser::parse_str(DOC), &config());
        assert_eq!(report.created_stories(), 3);
        assert_eq!(report.unlinked(), 3);
        assert_eq!(report.failures(), 0);
    }

    #[test]
    fn connection_and_issue_types() {
        let tracker = FakeTracker::default();
        let project = connect(&tracker, &config()).unwrap();
        assert_eq!(project.key, "ACME");

        assert_eq!(issue_types(&tracker, "ACME"), vec!["Epic", "Story", "Task", "Bug"]);
        assert_eq!(issue_types(&tracker, "NOPE"), vec!["Epic", "Story", "Task", "Bug"]);

        let mut config = config();
        config.jira.project_key = "NOPE".to_string();
        assert!(connect(&tracker, &config).is_err());
    }
}
