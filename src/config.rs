//! Process configuration.
//!
//! Everything is read once from the environment at startup and handed to the
//! tracker client and the routes explicitly.

use anyhow::{Context, Result};
use std::time::Duration;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:4000";
const DEFAULT_COMMENTS_PROJECT: &str = "PIR";
const DEFAULT_ALERTS_JQL: &str =
    "issuetype = Story AND sprint in openSprints() ORDER BY updated DESC";
const DEFAULT_MAX_RESULTS: u32 = 100;
const DEFAULT_SPRINT_FIELD: &str = "customfield_10010";
const STORY_POINTS_FIELD: &str = "customfield_10020";

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub tracker: TrackerConfig,
    /// Project scanned for same-day status update comments.
    pub comments_project: String,
    pub alerts_jql: String,
    /// Custom field holding an issue's sprints in platform search results.
    pub sprint_field: String,
}

/// Connection settings for the issue tracker.
#[derive(Clone)]
pub struct TrackerConfig {
    pub base_url: String,
    pub username: String,
    pub api_token: String,
    pub max_results: u32,
    pub timeout: Option<Duration>,
}

impl std::fmt::Debug for TrackerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackerConfig")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("api_token", &"<redacted>")
            .field("max_results", &self.max_results)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .with_context(|| format!("{} is not set", key))
        };

        let max_results = match lookup("SEARCH_MAX_RESULTS") {
            Some(v) => v
                .parse()
                .with_context(|| format!("SEARCH_MAX_RESULTS is not a number: {}", v))?,
            None => DEFAULT_MAX_RESULTS,
        };
        let timeout = lookup("TRACKER_TIMEOUT_SECS")
            .map(|v| {
                v.parse::<u64>()
                    .map(Duration::from_secs)
                    .with_context(|| format!("TRACKER_TIMEOUT_SECS is not a number: {}", v))
            })
            .transpose()?;

        let tracker = TrackerConfig {
            base_url: base_url_for(&required("DOMAIN")?),
            username: required("ATLASSIAN_USERNAME")?,
            api_token: required("ATLASSIAN_API_KEY")?,
            max_results,
            timeout,
        };

        let sprint_field = lookup("SPRINT_FIELD").unwrap_or_else(|| DEFAULT_SPRINT_FIELD.into());
        if sprint_field == STORY_POINTS_FIELD {
            anyhow::bail!("SPRINT_FIELD cannot be {}, it holds story points", STORY_POINTS_FIELD);
        }

        Ok(Config {
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.into()),
            tracker,
            comments_project: lookup("COMMENTS_PROJECT")
                .unwrap_or_else(|| DEFAULT_COMMENTS_PROJECT.into()),
            alerts_jql: lookup("ALERTS_JQL").unwrap_or_else(|| DEFAULT_ALERTS_JQL.into()),
            sprint_field,
        })
    }
}

/// A bare site name maps to its Atlassian Cloud URL, a full URL is kept as is.
fn base_url_for(domain: &str) -> String {
    let domain = domain.trim().trim_end_matches('/');
    if domain.contains("://") {
        domain.to_string()
    } else {
        format!("https://{}.atlassian.net", domain)
    }
}
