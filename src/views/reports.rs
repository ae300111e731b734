use poem::{
    handler,
    web::{Data, Json},
    Result,
};
use serde_json::{json, Value};

use crate::aggregate::{extract_status_updates, extract_story_alerts};
use crate::config::Config;
use crate::tracker::TrackerClient;

const ALERT_FIELDS: &[&str] = &[
    "summary",
    "issuetype",
    "status",
    "project",
    "assignee",
    "timetracking",
    "customfield_10003",
    "customfield_10020",
    "customfield_10157",
];

/// Tracker-wide queries behind the report routes.
#[derive(Debug, Clone)]
pub struct ReportSettings {
    pub alerts_jql: String,
    pub comments_project: String,
    pub sprint_field: String,
}

impl From<&Config> for ReportSettings {
    fn from(config: &Config) -> Self {
        Self {
            alerts_jql: config.alerts_jql.clone(),
            comments_project: config.comments_project.clone(),
            sprint_field: config.sprint_field.clone(),
        }
    }
}

#[handler]
pub async fn alerts(
    Data(tracker): Data<&TrackerClient>,
    Data(settings): Data<&ReportSettings>,
) -> Result<Json<Value>> {
    let mut fields = ALERT_FIELDS.to_vec();
    fields.push(&settings.sprint_field);
    let page = tracker.search(&settings.alerts_jql, &fields).await?;
    let alerts = extract_story_alerts(&page.issues, &settings.sprint_field)?;
    Ok(Json(json!({ "alerts": alerts })))
}

/// Today's status update comments for the configured project.
#[handler]
pub async fn comments(
    Data(tracker): Data<&TrackerClient>,
    Data(settings): Data<&ReportSettings>,
) -> Result<Json<Value>> {
    let page = tracker.day_comments(&settings.comments_project).await?;
    let today = chrono::Local::now().date_naive();
    let issues = extract_status_updates(&page.issues, today);
    tracing::debug!(
        scanned = page.issues.len(),
        with_updates = issues.len(),
        "collected status updates"
    );
    Ok(Json(json!({ "issues": issues })))
}
