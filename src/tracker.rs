use anyhow::Context;
use reqwest::Url;
use serde::de::DeserializeOwned;

use crate::config::TrackerConfig;
use crate::error::{Result, SprintboardError};
use crate::models::{IssuePage, SprintPage};

const AGILE_API: [&str; 3] = ["rest", "agile", "1.0"];
const NON_FUTURE_SPRINTS_JQL: &str = "sprint in openSprints() OR sprint in closedSprints()";
const DAY_COMMENT_FIELDS: &[&str] = &[
    "key",
    "project",
    "assignee",
    "status",
    "comment",
    "issuetype",
    "updated",
];

/// Thin client over the tracker's REST API.
///
/// Every call is a single Basic-Auth request; responses are decoded into the
/// wire model without any reshaping.
#[derive(Clone)]
pub struct TrackerClient {
    http: reqwest::Client,
    base_url: Url,
    username: String,
    api_token: String,
    max_results: u32,
}

/// Rejects blank identifiers before anything goes over the wire.
pub fn require<'a>(name: &str, value: &'a str) -> Result<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(SprintboardError::InvalidArgument(format!(
            "{} is required",
            name
        )));
    }
    Ok(value)
}

impl TrackerClient {
    pub fn new(config: &TrackerConfig) -> anyhow::Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .with_context(|| format!("invalid tracker url {}", config.base_url))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("tracker url {} cannot be used as a base", config.base_url);
        }

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            base_url,
            username: config.username.clone(),
            api_token: config.api_token.clone(),
            max_results: config.max_results,
        })
    }

    pub async fn board_sprints(&self, board_id: &str) -> Result<SprintPage> {
        let board_id = require("boardId", board_id)?;
        self.get(&["board", board_id, "sprint"], &[]).await
    }

    pub async fn sprint_issues(&self, sprint_id: &str) -> Result<IssuePage> {
        let sprint_id = require("sprintId", sprint_id)?;
        let max_results = self.max_results.to_string();
        self.get(
            &["sprint", sprint_id, "issue"],
            &[("maxResults", max_results.as_str())],
        )
        .await
    }

    /// Issues of every started sprint on the board, future sprints excluded.
    pub async fn board_issues(&self, board_id: &str) -> Result<IssuePage> {
        let board_id = require("boardId", board_id)?;
        let max_results = self.max_results.to_string();
        self.get(
            &["board", board_id, "issue"],
            &[
                ("jql", NON_FUTURE_SPRINTS_JQL),
                ("maxResults", max_results.as_str()),
            ],
        )
        .await
    }

    pub async fn search(&self, jql: &str, fields: &[&str]) -> Result<IssuePage> {
        let jql = require("jql", jql)?;
        let url = self.url(&["rest", "api", "2", "search"]);
        tracing::debug!(path = url.path(), jql, "searching tracker");

        let mut body = serde_json::json!({
            "jql": jql,
            "maxResults": self.max_results,
        });
        if !fields.is_empty() {
            body["fields"] = serde_json::json!(fields);
        }

        let page = self
            .http
            .post(url)
            .basic_auth(&self.username, Some(&self.api_token))
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(page)
    }

    /// Issues of `project` touched today, with their comments.
    pub async fn day_comments(&self, project: &str) -> Result<IssuePage> {
        let project = require("project", project)?;
        let jql = format!(
            "project = '{}' AND updatedDate >= startOfDay() AND updatedDate <= endOfDay() ORDER BY updated DESC",
            project
        );
        self.search(&jql, DAY_COMMENT_FIELDS).await
    }

    async fn get<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> Result<T> {
        let mut url = self.url(&AGILE_API);
        if let Ok(mut path) = url.path_segments_mut() {
            path.extend(segments);
        }
        tracing::debug!(path = url.path(), "querying tracker");

        let value = self
            .http
            .get(url)
            .basic_auth(&self.username, Some(&self.api_token))
            .query(query)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(value)
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // Checked in `new`.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}
