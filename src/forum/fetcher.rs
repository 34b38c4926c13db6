use std::collections::HashSet;
use std::time::Duration;

use reqwest::Client;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{Config, FetchErrorPolicy};
use crate::constants::RECENT_POSTS_PATH;
use crate::forum::models::{RecentPost, Topic};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned status {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("failed to decode recent posts from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Scans the forum's recent-posts listing for topics newer than the cursor.
pub struct TopicFetcher {
    client: Client,
    base_url: String,
    max_pages: u32,
    page_delay: Duration,
    policy: FetchErrorPolicy,
}

impl TopicFetcher {
    #[must_use]
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            base_url: config.forum_base_url.clone(),
            max_pages: config.max_pages,
            page_delay: config.page_delay,
            policy: config.fetch_error_policy,
        }
    }

    /// Collect main posts with an id above `last_seen_id`, newest first.
    ///
    /// Pages are requested in order, each after the courtesy delay, until a main post at
    /// or below the cursor shows up or `max_pages` is reached.
    ///
    /// # Errors
    ///
    /// With [`FetchErrorPolicy::Abort`], returns the first page failure. With
    /// [`FetchErrorPolicy::Skip`] page failures are logged and never returned.
    pub async fn discover_new_topics(&self, last_seen_id: i64) -> Result<Vec<Topic>, FetchError> {
        let mut topics = Vec::new();
        let mut seen = HashSet::new();

        for page in 1..=self.max_pages {
            tokio::time::sleep(self.page_delay).await;

            let posts = match self.fetch_page(page).await {
                Ok(posts) => posts,
                Err(e) => match self.policy {
                    FetchErrorPolicy::Abort => return Err(e),
                    FetchErrorPolicy::Skip => {
                        warn!(page, "Skipping recent posts page: {e}");
                        continue;
                    }
                },
            };

            if collect_page(posts, last_seen_id, &mut seen, &mut topics) {
                debug!(page, last_seen_id, "Reached known topic, stopping scan");
                break;
            }
        }

        info!(count = topics.len(), last_seen_id, "Discovered new topics");
        Ok(topics)
    }

    async fn fetch_page(&self, page: u32) -> Result<Vec<RecentPost>, FetchError> {
        let url = format!("{}{RECENT_POSTS_PATH}?page={page}", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| FetchError::Request {
                url: url.clone(),
                source,
            })?;
        info!(url = %url, "Sent request");

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status { url, status });
        }

        let body = response.bytes().await.map_err(|source| FetchError::Request {
            url: url.clone(),
            source,
        })?;

        serde_json::from_slice(&body).map_err(|source| FetchError::Decode { url, source })
    }
}

/// Append new topics from one page. Returns `true` once the cursor boundary is hit.
fn collect_page(
    posts: Vec<RecentPost>,
    last_seen_id: i64,
    seen: &mut HashSet<i64>,
    topics: &mut Vec<Topic>,
) -> bool {
    for post in posts {
        if !post.is_main_post {
            continue;
        }
        if post.tid <= last_seen_id {
            return true;
        }
        if !seen.insert(post.tid) {
            continue;
        }
        let tid = post.tid;
        match post.into_topic() {
            Some(topic) => topics.push(topic),
            None => warn!(tid, "Main post is missing topic, user or category data"),
        }
    }
    false
}
