//! Flattening and aggregation of tracker issues.
//!
//! Everything here is a pure function of its input: results are rebuilt for
//! every request and the same issues always give the same output, in input
//! order.

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, NaiveDate};
use itertools::Itertools;
use serde::{Serialize, Serializer};

use crate::error::{Result, SprintboardError};
use crate::models::{Issue, Sprint, SprintState};

const DONE: &str = "Done";
const NOT_ADDED: &str = "Not added";
const NO_REVIEWERS: &str = "Reviewers not added";
const TRACKER_TIMESTAMP: &str = "%Y-%m-%dT%H:%M:%S%.f%z";

pub const STATUS_UPDATE_MARKER: &str = "[#STATUS_UPDATE#]:";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoryRecord {
    pub story_id: String,
    pub story_name: String,
    pub story_type: String,
    pub story_status: String,
    pub project_id: String,
    pub project_name: Option<String>,
    pub status_name: String,
    pub sprint_id: String,
    pub story_ac_hygiene: &'static str,
    pub original_estimate: String,
    pub remaining_estimate: String,
    pub time_spent: String,
    pub story_reviewers: String,
    #[serde(serialize_with = "serialize_opt_points")]
    pub story_points: Option<f64>,
    pub assignee_account_id: Option<String>,
    pub assignee_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoryProgress {
    pub number_of_sub_tasks: u32,
    pub completed_sub_tasks: u32,
    pub story_id: String,
    pub story_name: String,
    pub project_id: String,
    pub sprint_id: String,
    #[serde(serialize_with = "serialize_points")]
    pub story_points: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusGroup {
    pub story_id: String,
    pub status_category_name: String,
    pub issue_count: u32,
    pub assignee_account_id: Option<String>,
    pub assignee_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberScope {
    /// One entry per display name.
    Sprint,
    /// One entry per display name and sprint.
    Board,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Member {
    pub sprint_member_account_id: Option<String>,
    pub sprint_member_full_name: String,
    pub sprint_member_card_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sprint_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SprintSummary {
    pub sprint_id: String,
    pub sprint_name: String,
    pub sprint_state: SprintState,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub complete_date: Option<String>,
    pub board_id: Option<String>,
    pub goal: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoryAlert {
    #[serde(flatten)]
    pub story: StoryRecord,
    pub sprint_name: String,
    pub sprint_state: SprintState,
    pub sprint_start_date: Option<String>,
    pub sprint_end_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusUpdate {
    pub comment_id: Option<String>,
    pub author: Option<String>,
    pub body: String,
    pub updated: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusUpdateIssue {
    pub issue_id: String,
    pub issue_key: Option<String>,
    pub issue_type: Option<String>,
    pub status_name: Option<String>,
    pub project_name: Option<String>,
    pub assignee_name: Option<String>,
    pub updated: Option<String>,
    #[serde(rename = "statusUpdates")]
    pub status_updates: Vec<StatusUpdate>,
}

pub fn extract_stories(issues: &[Issue]) -> Result<Vec<StoryRecord>> {
    issues
        .iter()
        .filter(|issue| issue.is_story())
        .map(story_record)
        .collect()
}

fn story_record(issue: &Issue) -> Result<StoryRecord> {
    let sprint = issue
        .fields
        .sprint
        .as_ref()
        .ok_or_else(|| SprintboardError::missing_field(&issue.id, "sprint"))?;
    story_record_in(issue, sprint)
}

fn story_record_in(issue: &Issue, sprint: &Sprint) -> Result<StoryRecord> {
    let fields = &issue.fields;
    let missing = |field: &'static str| SprintboardError::missing_field(&issue.id, field);

    let summary = fields.summary.as_ref().ok_or_else(|| missing("summary"))?;
    let status = fields.status.as_ref().ok_or_else(|| missing("status"))?;
    let category = issue
        .status_category()
        .ok_or_else(|| missing("status.statusCategory"))?;
    let project = fields.project.as_ref().ok_or_else(|| missing("project"))?;
    let timetracking = fields.timetracking.clone().unwrap_or_default();

    let has_acceptance_criteria = match &fields.acceptance_criteria {
        None | Some(serde_json::Value::Null) | Some(serde_json::Value::Bool(false)) => false,
        Some(serde_json::Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    };

    let story_reviewers = match &fields.reviewers {
        Some(reviewers) if !reviewers.is_empty() => reviewers
            .iter()
            .filter_map(|r| r.display_name.as_deref())
            .join(", "),
        _ => NO_REVIEWERS.to_string(),
    };

    let or_not_added = |v: Option<String>| v.unwrap_or_else(|| NOT_ADDED.to_string());

    Ok(StoryRecord {
        story_id: issue.id.clone(),
        story_name: summary.clone(),
        story_type: crate::models::STORY.to_string(),
        story_status: category.to_string(),
        project_id: project.id.clone(),
        project_name: project.name.clone(),
        status_name: status.name.clone(),
        sprint_id: sprint.id.to_string(),
        story_ac_hygiene: if has_acceptance_criteria { "YES" } else { "NO" },
        original_estimate: or_not_added(timetracking.original_estimate),
        remaining_estimate: or_not_added(timetracking.remaining_estimate),
        time_spent: or_not_added(timetracking.time_spent),
        story_reviewers,
        story_points: fields.story_points,
        assignee_account_id: fields.assignee.as_ref().and_then(|a| a.account_id.clone()),
        assignee_name: fields.assignee.as_ref().and_then(|a| a.display_name.clone()),
    })
}

/// Rolls sub-task counts and points up into their parent stories.
///
/// Stories are seeded first so that sub-tasks listed before their story are
/// still counted. Sub-tasks whose parent is not among `issues` are skipped.
/// Records come out in the order the stories appear in `issues`, not sorted
/// by story id.
pub fn compute_story_progress(issues: &[Issue]) -> Result<Vec<StoryProgress>> {
    let mut progress = Vec::new();
    let mut by_story: HashMap<&str, usize> = HashMap::new();

    for story in issues.iter().filter(|issue| issue.is_story()) {
        if by_story.contains_key(story.id.as_str()) {
            continue;
        }
        let fields = &story.fields;
        let missing = |field: &'static str| SprintboardError::missing_field(&story.id, field);

        let entry = StoryProgress {
            number_of_sub_tasks: 0,
            completed_sub_tasks: 0,
            story_id: story.id.clone(),
            story_name: fields.summary.clone().ok_or_else(|| missing("summary"))?,
            project_id: fields
                .project
                .as_ref()
                .map(|p| p.id.clone())
                .ok_or_else(|| missing("project"))?,
            sprint_id: fields
                .sprint
                .as_ref()
                .map(|s| s.id.to_string())
                .ok_or_else(|| missing("sprint"))?,
            story_points: 0.0,
        };
        by_story.insert(&story.id, progress.len());
        progress.push(entry);
    }

    for sub_task in issues.iter().filter(|issue| issue.is_sub_task()) {
        let entry = match sub_task.parent_id().and_then(|id| by_story.get(id)) {
            Some(&idx) => &mut progress[idx],
            None => continue,
        };
        entry.number_of_sub_tasks += 1;
        if let Some(points) = sub_task.fields.story_points {
            entry.story_points += points;
        }
        if sub_task.status_name() == Some(DONE) {
            entry.completed_sub_tasks += 1;
        }
    }

    Ok(progress)
}

/// Counts sub-tasks per (story, status category).
///
/// The assignee kept for a group is the one of the last assigned sub-task
/// seen for it.
pub fn compute_status_groups(issues: &[Issue]) -> Result<Vec<StatusGroup>> {
    let mut groups: Vec<StatusGroup> = Vec::new();
    let mut index: HashMap<(&str, &str), usize> = HashMap::new();

    for sub_task in issues.iter().filter(|issue| issue.is_sub_task()) {
        let story_id = match sub_task.parent_id() {
            Some(id) => id,
            None => continue,
        };
        let category = sub_task
            .status_category()
            .ok_or_else(|| SprintboardError::missing_field(&sub_task.id, "status.statusCategory"))?;

        let idx = *index.entry((story_id, category)).or_insert_with(|| {
            groups.push(StatusGroup {
                story_id: story_id.to_string(),
                status_category_name: category.to_string(),
                issue_count: 0,
                assignee_account_id: None,
                assignee_name: None,
            });
            groups.len() - 1
        });

        let group = &mut groups[idx];
        group.issue_count += 1;
        if let Some(assignee) = &sub_task.fields.assignee {
            group.assignee_account_id = assignee.account_id.clone();
            group.assignee_name = assignee.display_name.clone();
        }
    }

    Ok(groups)
}

pub fn extract_members(issues: &[Issue], scope: MemberScope) -> Vec<Member> {
    issues
        .iter()
        .filter(|issue| !issue.is_story())
        .filter_map(|issue| {
            let assignee = issue.fields.assignee.as_ref()?;
            let name = assignee.display_name.as_ref()?;
            let sprint_id = match scope {
                MemberScope::Sprint => None,
                MemberScope::Board => issue.fields.sprint.as_ref().map(|s| s.id.to_string()),
            };
            Some(Member {
                sprint_member_account_id: assignee.account_id.clone(),
                sprint_member_full_name: name.clone(),
                sprint_member_card_name: card_name(name),
                sprint_id,
            })
        })
        .unique_by(|m| (m.sprint_id.clone(), m.sprint_member_full_name.clone()))
        .collect()
}

fn card_name(display_name: &str) -> String {
    display_name.chars().take(2).collect::<String>().to_uppercase()
}

/// The running sprint, or the most recently closed one when none is running.
pub fn select_active_sprint(sprints: &[Sprint]) -> Option<&Sprint> {
    sprints
        .iter()
        .find(|s| s.state == SprintState::Active)
        .or_else(|| {
            sprints
                .iter()
                .rev()
                .find(|s| s.state == SprintState::Closed)
        })
}

pub fn flatten_sprints(sprints: &[Sprint]) -> Vec<SprintSummary> {
    sprints
        .iter()
        .filter(|s| s.state != SprintState::Future)
        .map(|s| SprintSummary {
            sprint_id: s.id.to_string(),
            sprint_name: s.name.clone(),
            sprint_state: s.state.clone(),
            start_date: s.start_date.clone(),
            end_date: s.end_date.clone(),
            complete_date: s.complete_date.clone(),
            board_id: s.origin_board_id.map(|id| id.to_string()),
            goal: s.goal.clone(),
        })
        .collect()
}

/// Stories with the sprint they belong to.
///
/// The agile API reports the sprint as `sprint`; the platform search API only
/// carries it in the custom field `sprint_field`, which is read as a fallback.
pub fn extract_story_alerts(issues: &[Issue], sprint_field: &str) -> Result<Vec<StoryAlert>> {
    issues
        .iter()
        .filter(|issue| issue.is_story())
        .map(|issue| {
            let sprint = match &issue.fields.sprint {
                Some(sprint) => sprint.clone(),
                None => issue
                    .sprint_in_field(sprint_field)
                    .ok_or_else(|| SprintboardError::missing_field(&issue.id, "sprint"))?,
            };
            Ok(StoryAlert {
                story: story_record_in(issue, &sprint)?,
                sprint_name: sprint.name,
                sprint_state: sprint.state,
                sprint_start_date: sprint.start_date,
                sprint_end_date: sprint.end_date,
            })
        })
        .collect()
}

/// Issues carrying status update comments written on `today`, marker removed.
pub fn extract_status_updates(issues: &[Issue], today: NaiveDate) -> Vec<StatusUpdateIssue> {
    issues
        .iter()
        .filter_map(|issue| {
            let comments = issue.fields.comment.as_ref()?;
            let status_updates = comments
                .comments
                .iter()
                .filter_map(|comment| {
                    let updated = comment.updated.as_ref()?;
                    if parse_timestamp(updated)?.date_naive() != today {
                        return None;
                    }
                    let body = comment.body.strip_prefix(STATUS_UPDATE_MARKER)?;
                    Some(StatusUpdate {
                        comment_id: comment.id.clone(),
                        author: comment.author.as_ref().and_then(|a| a.display_name.clone()),
                        body: body.trim_start().to_string(),
                        updated: updated.clone(),
                    })
                })
                .collect::<Vec<_>>();

            if status_updates.is_empty() {
                return None;
            }

            let fields = &issue.fields;
            Some(StatusUpdateIssue {
                issue_id: issue.id.clone(),
                issue_key: issue.key.clone(),
                issue_type: fields.issuetype.as_ref().map(|t| t.name.clone()),
                status_name: issue.status_name().map(Into::into),
                project_name: fields.project.as_ref().and_then(|p| p.name.clone()),
                assignee_name: fields.assignee.as_ref().and_then(|a| a.display_name.clone()),
                updated: fields.updated.clone(),
                status_updates,
            })
        })
        .collect()
}

/// Whole point counts are written as integers (`5`, not `5.0`).
fn serialize_points<S: Serializer>(points: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if points.fract() == 0.0 && points.abs() < i64::MAX as f64 {
        serializer.serialize_i64(*points as i64)
    } else {
        serializer.serialize_f64(*points)
    }
}

fn serialize_opt_points<S: Serializer>(
    points: &Option<f64>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match points {
        Some(points) => serialize_points(points, serializer),
        None => serializer.serialize_none(),
    }
}

fn parse_timestamp(value: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_str(value, TRACKER_TIMESTAMP)
        .or_else(|_| DateTime::parse_from_rfc3339(value))
        .ok()
}
