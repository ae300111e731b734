//! Wire model of the tracker's JSON.
//!
//! Nearly every field is optional: the tracker omits fields freely depending
//! on the endpoint and the project's field configuration. Each transform in
//! [`crate::aggregate`] decides which of them it actually requires.

use serde::{Deserialize, Deserializer, Serialize};

pub const STORY: &str = "Story";
pub const SUB_TASK: &str = "Sub-task";

#[derive(Debug, Clone, Deserialize)]
pub struct IssuePage {
    #[serde(default)]
    pub issues: Vec<Issue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SprintPage {
    #[serde(default)]
    pub values: Vec<Sprint>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Issue {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub key: Option<String>,
    #[serde(default)]
    pub fields: IssueFields,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueKind {
    Story,
    SubTask,
    Other(String),
}

impl Issue {
    pub fn kind(&self) -> IssueKind {
        match self.fields.issuetype.as_ref().map(|t| t.name.as_str()) {
            Some(STORY) => IssueKind::Story,
            Some(SUB_TASK) => IssueKind::SubTask,
            Some(other) => IssueKind::Other(other.to_string()),
            None => IssueKind::Other(String::new()),
        }
    }

    pub fn is_story(&self) -> bool {
        self.kind() == IssueKind::Story
    }

    pub fn is_sub_task(&self) -> bool {
        self.kind() == IssueKind::SubTask
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.fields.parent.as_ref().map(|p| p.id.as_str())
    }

    pub fn status_name(&self) -> Option<&str> {
        self.fields.status.as_ref().map(|s| s.name.as_str())
    }

    /// The sprint the platform search API reports in custom field `field`:
    /// the active one, else the last listed.
    pub fn sprint_in_field(&self, field: &str) -> Option<Sprint> {
        let sprints: Vec<Sprint> = match self.fields.custom.get(field)? {
            value @ serde_json::Value::Array(_) => serde_json::from_value(value.clone()).ok()?,
            value @ serde_json::Value::Object(_) => vec![serde_json::from_value(value.clone()).ok()?],
            _ => return None,
        };
        match sprints.iter().position(|s| s.state == SprintState::Active) {
            Some(idx) => sprints.into_iter().nth(idx),
            None => sprints.into_iter().last(),
        }
    }

    pub fn status_category(&self) -> Option<&str> {
        self.fields
            .status
            .as_ref()
            .and_then(|s| s.status_category.as_ref())
            .map(|c| c.name.as_str())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IssueFields {
    pub summary: Option<String>,
    pub issuetype: Option<IssueType>,
    pub status: Option<Status>,
    pub project: Option<Project>,
    pub parent: Option<ParentRef>,
    pub sprint: Option<Sprint>,
    pub assignee: Option<User>,
    #[serde(rename = "customfield_10020")]
    pub story_points: Option<f64>,
    #[serde(rename = "customfield_10157")]
    pub acceptance_criteria: Option<serde_json::Value>,
    #[serde(rename = "customfield_10003")]
    pub reviewers: Option<Vec<User>>,
    pub timetracking: Option<TimeTracking>,
    pub comment: Option<CommentPage>,
    pub updated: Option<String>,
    /// Custom fields whose id is only known at runtime.
    #[serde(flatten)]
    pub custom: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IssueType {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    pub name: String,
    pub status_category: Option<StatusCategory>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusCategory {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Project {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParentRef {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub account_id: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeTracking {
    pub original_estimate: Option<String>,
    pub remaining_estimate: Option<String>,
    pub time_spent: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentPage {
    #[serde(default)]
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Comment {
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub id: Option<String>,
    pub author: Option<User>,
    #[serde(default)]
    pub body: String,
    pub updated: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SprintState {
    Active,
    Closed,
    Future,
}

/// Sprint as returned by the board API. Serialized back unchanged for the
/// raw sprint listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sprint {
    pub id: u64,
    #[serde(rename = "self", skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
    pub state: SprintState,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complete_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_board_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goal: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Number(serde_json::Number),
}

impl From<StringOrNumber> for String {
    fn from(v: StringOrNumber) -> Self {
        match v {
            StringOrNumber::String(s) => s,
            StringOrNumber::Number(n) => n.to_string(),
        }
    }
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    StringOrNumber::deserialize(deserializer).map(Into::into)
}

fn opt_string_or_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Option::<StringOrNumber>::deserialize(deserializer).map(|v| v.map(Into::into))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numeric_ids_become_strings() {
        let issue: Issue = serde_json::from_value(json!({
            "id": 10001,
            "fields": {
                "issuetype": { "name": "Sub-task" },
                "parent": { "id": 10000 },
                "project": { "id": 7, "name": "Pirates" }
            }
        }))
        .unwrap();
        assert_eq!(issue.id, "10001");
        assert_eq!(issue.parent_id(), Some("10000"));
        assert_eq!(issue.fields.project.unwrap().id, "7");
    }

    #[test]
    fn issue_kind_is_exact() {
        let kind = |name: &str| {
            let issue: Issue = serde_json::from_value(json!({
                "id": "1",
                "fields": { "issuetype": { "name": name } }
            }))
            .unwrap();
            issue.kind()
        };
        assert_eq!(kind("Story"), IssueKind::Story);
        assert_eq!(kind("Sub-task"), IssueKind::SubTask);
        assert_eq!(kind("story"), IssueKind::Other("story".into()));
        assert_eq!(kind("Bug"), IssueKind::Other("Bug".into()));
    }

    #[test]
    fn missing_fields_are_tolerated() {
        let issue: Issue = serde_json::from_value(json!({ "id": "5" })).unwrap();
        assert_eq!(issue.kind(), IssueKind::Other(String::new()));
        assert_eq!(issue.status_name(), None);
        assert_eq!(issue.status_category(), None);
    }

    #[test]
    fn sprint_custom_field_prefers_active() {
        let issue: Issue = serde_json::from_value(json!({
            "id": "1",
            "fields": {
                "customfield_10010": [
                    { "id": 6, "state": "closed", "name": "Sprint 6", "boardId": 4 },
                    { "id": 7, "state": "active", "name": "Sprint 7", "boardId": 4 },
                    { "id": 8, "state": "future", "name": "Sprint 8", "boardId": 4 }
                ]
            }
        }))
        .unwrap();
        assert!(issue.fields.sprint.is_none());
        assert_eq!(issue.sprint_in_field("customfield_10010").map(|s| s.id), Some(7));
        assert!(issue.sprint_in_field("customfield_99999").is_none());
    }

    #[test]
    fn sprint_custom_field_falls_back_to_last() {
        let issue: Issue = serde_json::from_value(json!({
            "id": "1",
            "fields": {
                "customfield_10010": [
                    { "id": 5, "state": "closed", "name": "Sprint 5" },
                    { "id": 6, "state": "closed", "name": "Sprint 6" }
                ],
                "customfield_10011": "not a sprint"
            }
        }))
        .unwrap();
        assert_eq!(issue.sprint_in_field("customfield_10010").map(|s| s.id), Some(6));
        assert!(issue.sprint_in_field("customfield_10011").is_none());
    }

    #[test]
    fn sprint_round_trips_camel_case() {
        let sprint: Sprint = serde_json::from_value(json!({
            "id": 37,
            "self": "https://acme.atlassian.net/rest/agile/1.0/sprint/37",
            "state": "closed",
            "name": "Sprint 12",
            "startDate": "2026-09-01T09:00:00.000Z",
            "endDate": "2026-09-14T17:00:00.000Z",
            "originBoardId": 4
        }))
        .unwrap();
        assert_eq!(sprint.state, SprintState::Closed);
        let value = serde_json::to_value(&sprint).unwrap();
        assert_eq!(value["startDate"], "2026-09-01T09:00:00.000Z");
        assert_eq!(value["self"], "https://acme.atlassian.net/rest/agile/1.0/sprint/37");
        assert!(value.get("goal").is_none());
    }
}
