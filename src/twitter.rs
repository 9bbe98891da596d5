use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::retry::RetryPolicy;

const API_BASE: &str = "https://api.twitter.com/2";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const FETCH_RETRY: RetryPolicy = RetryPolicy::new(3, Duration::from_secs(5), 2);

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("account not found")]
    NotFound,
    #[error("unauthorized (check the bearer token)")]
    Unauthorized,
    #[error("rate limited")]
    RateLimited,
    #[error("unexpected status {0}")]
    Status(StatusCode),
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// One tweet as returned by the timeline endpoint. Fetch order is not
/// guaranteed to be newest-first; callers compare ids instead.
#[derive(Debug, Clone, Deserialize)]
pub struct Post {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

// Response shapes, kept loose: a 2xx body that doesn't carry the expected
// fields degrades to "nothing found" rather than an error.

#[derive(Deserialize)]
struct UserLookup {
    #[serde(default)]
    data: Option<UserData>,
}

#[derive(Deserialize)]
struct UserData {
    id: String,
}

#[derive(Deserialize)]
struct Timeline {
    #[serde(default)]
    data: Vec<Post>,
}

/// Where the watcher gets its posts from. Split out so tests can drive
/// the watcher without a network.
#[async_trait]
pub trait PostSource: Send + Sync {
    async fn resolve(&self, handle: &str) -> Result<String, SourceError>;
    async fn fetch_recent(&self, user_id: &str) -> Vec<Post>;
}

pub struct TwitterClient {
    http: reqwest::Client,
    bearer_token: String,
    retry: RetryPolicy,
}

impl TwitterClient {
    pub fn new(bearer_token: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            bearer_token,
            retry: FETCH_RETRY,
        }
    }

    async fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<reqwest::Response, SourceError> {
        let response = self
            .http
            .get(url)
            .query(query)
            .bearer_auth(&self.bearer_token)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;
        match response.status() {
            s if s.is_success() => Ok(response),
            StatusCode::NOT_FOUND => Err(SourceError::NotFound),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(SourceError::Unauthorized),
            StatusCode::TOO_MANY_REQUESTS => Err(SourceError::RateLimited),
            other => Err(SourceError::Status(other)),
        }
    }

    async fn try_fetch(&self, user_id: &str) -> Result<Vec<Post>, SourceError> {
        let url = format!("{API_BASE}/users/{user_id}/tweets");
        let response = self
            .get(&url, &[("max_results", "5"), ("tweet.fields", "created_at")])
            .await?;
        let timeline: Timeline = response.json().await?;
        debug!("Fetched {} posts for user {}", timeline.data.len(), user_id);
        Ok(timeline.data)
    }
}

#[async_trait]
impl PostSource for TwitterClient {
    /// Handle -> user id lookup. Single attempt: resolution happens once
    /// at startup and a failed handle is excluded, not retried.
    async fn resolve(&self, handle: &str) -> Result<String, SourceError> {
        let handle = handle.trim_start_matches('@');
        let url = format!("{API_BASE}/users/by/username/{handle}");
        let response = self.get(&url, &[]).await?;
        let lookup: UserLookup = response.json().await?;
        lookup.data.map(|d| d.id).ok_or(SourceError::NotFound)
    }

    /// Recent posts for a resolved account. Rate limiting is retried with
    /// backoff; every other failure (and retry exhaustion) degrades to an
    /// empty batch so one bad account never stalls the polling cycle.
    async fn fetch_recent(&self, user_id: &str) -> Vec<Post> {
        let result = self
            .retry
            .run(
                || self.try_fetch(user_id),
                |e| matches!(e, SourceError::RateLimited),
            )
            .await;
        match result {
            Ok(posts) => posts,
            Err(e) => {
                warn!("Giving up on user {} this cycle: {}", user_id, e);
                Vec::new()
            }
        }
    }
}
