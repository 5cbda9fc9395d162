//! Talks to the Jira REST API
//!
//! [`IssueTracker`] is the seam between the submission logic and the
//! network. [`JiraClient`] implements it with blocking HTTP calls; the field
//! builders in this module turn parsed epics and stories into the JSON Jira
//! expects.
//!
//! [`IssueTracker`]: trait.IssueTracker.html
//! [`JiraClient`]: struct.JiraClient.html
use crate::config::{JiraSettings, StorySettings};
use crate::{Epic, UserStory};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::ACCEPT;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Issue types assumed when the project's cannot be listed
pub const DEFAULT_ISSUE_TYPES: [&str; 4] = ["Epic", "Story", "Task", "Bug"];

#[derive(Debug, Error)]
pub enum JiraError {
    #[error("Request to Jira failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Jira returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Unexpected response from Jira: {0}")]
    UnexpectedResponse(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProjectLead {
    #[serde(rename = "displayName")]
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IssueTypeInfo {
    pub name: String,
}

/// The parts of a Jira project we show to the operator
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProjectInfo {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub lead: Option<ProjectLead>,
    #[serde(default, rename = "issueTypes")]
    pub issue_types: Vec<IssueTypeInfo>,
}

impl ProjectInfo {
    pub fn lead_name(&self) -> &str {
        self.lead
            .as_ref()
            .map(|lead| lead.display_name.as_str())
            .unwrap_or("Unknown")
    }

    pub fn description_or_default(&self) -> &str {
        self.description
            .as_deref()
            .filter(|d| !d.is_empty())
            .unwrap_or("No description")
    }

    pub fn issue_type_names(&self) -> Vec<String> {
        self.issue_types.iter().map(|t| t.name.clone()).collect()
    }
}

#[derive(Debug, Deserialize)]
struct CreatedIssue {
    key: String,
}

/// The operations submission needs from an issue tracker
pub trait IssueTracker {
    /// Looks up a project by key
    fn project(&self, key: &str) -> Result<ProjectInfo, JiraError>;

    /// Creates an issue from a Jira `fields` object and returns its key
    fn create_issue(&self, fields: &Value) -> Result<String, JiraError>;

    /// Moves the given issues into an epic
    fn add_to_epic(&self, epic_key: &str, issue_keys: &[String]) -> Result<(), JiraError>;
}

/// Blocking client for a Jira Cloud or Server instance
pub struct JiraClient {
    http: Client,
    base_url: String,
    username: String,
    api_token: String,
}

impl JiraClient {
    pub fn new(settings: &JiraSettings) -> Result<Self, JiraError> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(JiraClient {
            http,
            base_url: settings.base_url().to_string(),
            username: settings.username.clone(),
            api_token: settings.api_token.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn send(&self, request: RequestBuilder) -> Result<Response, JiraError> {
        let response = request
            .basic_auth(&self.username, Some(&self.api_token))
            .header(ACCEPT, "application/json")
            .send()?;

        let status = response.status();
        debug!(status = status.as_u16(), url = %response.url(), "jira response");
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().unwrap_or_default();
            Err(JiraError::Status {
                status: status.as_u16(),
                message: error_message(&body),
            })
        }
    }
}

impl IssueTracker for JiraClient {
    fn project(&self, key: &str) -> Result<ProjectInfo, JiraError> {
        let url = self.url(&format!("rest/api/2/project/{}", key));
        self.send(self.http.get(url))?
            .json()
            .map_err(|e| JiraError::UnexpectedResponse(e.to_string()))
    }

    fn create_issue(&self, fields: &Value) -> Result<String, JiraError> {
        let url = self.url("rest/api/2/issue");
        let body = json!({ "fields": fields });
        let created: CreatedIssue = self
            .send(self.http.post(url).json(&body))?
            .json()
            .map_err(|e| JiraError::UnexpectedResponse(e.to_string()))?;
        Ok(created.key)
    }

    fn add_to_epic(&self, epic_key: &str, issue_keys: &[String]) -> Result<(), JiraError> {
        let url = self.url(&format!("rest/agile/1.0/epic/{}/issue", epic_key));
        let body = json!({ "issues": issue_keys });
        self.send(self.http.post(url).json(&body))?;
        Ok(())
    }
}

/// Pulls Jira's `errorMessages` and per-field `errors` out of an error body,
/// falling back to the raw body
pub fn error_message(body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let mut messages = Vec::new();

    if let Some(value) = &parsed {
        if let Some(list) = value.get("errorMessages").and_then(Value::as_array) {
            messages.extend(list.iter().filter_map(Value::as_str).map(str::to_string));
        }
        if let Some(map) = value.get("errors").and_then(Value::as_object) {
            let mut fields: Vec<String> = map
                .iter()
                .map(|(field, msg)| match msg.as_str() {
                    Some(msg) => format!("{}: {}", field, msg),
                    None => format!("{}: {}", field, msg),
                })
                .collect();
            fields.sort();
            messages.extend(fields);
        }
    }

    if messages.is_empty() {
        let body = body.trim();
        if body.is_empty() {
            "no details given".to_string()
        } else {
            body.to_string()
        }
    } else {
        messages.join("; ")
    }
}

/// Builds the `fields` object for an epic
pub fn epic_fields(epic: &Epic, project_key: &str, settings: &StorySettings) -> Value {
    let mut fields = Map::new();
    fields.insert("project".into(), json!({ "key": project_key }));
    fields.insert(
        "summary".into(),
        json!(format!("{}{}", settings.epic_name_prefix, epic.title)),
    );
    fields.insert(
        "description".into(),
        json!(format!("Epic containing {} user stories", epic.story_count())),
    );
    fields.insert("issuetype".into(), json!({ "name": settings.epic_type }));
    if !settings.epic_name_field.is_empty() {
        fields.insert(settings.epic_name_field.clone(), json!(epic.title));
    }
    Value::Object(fields)
}

/// Builds the `fields` object for a story
///
/// Only priorities found in `priorities` are sent, as their mapped name.
/// Story points are sent when present and non-zero.
pub fn story_fields(
    story: &UserStory,
    project_key: &str,
    settings: &StorySettings,
    priorities: &HashMap<String, String>,
) -> Value {
    let mut fields = Map::new();
    fields.insert("project".into(), json!({ "key": project_key }));
    fields.insert("summary".into(), json!(story.title));
    fields.insert("description".into(), json!(story.description));
    fields.insert("issuetype".into(), json!({ "name": settings.story_type }));

    if let Some(mapped) = story.priority.as_ref().and_then(|p| priorities.get(p)) {
        fields.insert("priority".into(), json!({ "name": mapped }));
    }

    match story.story_points {
        Some(points) if points > 0 && !settings.story_points_field.is_empty() => {
            fields.insert(settings.story_points_field.clone(), json!(points));
        }
        _ => {}
    }

    Value::Object(fields)
}
