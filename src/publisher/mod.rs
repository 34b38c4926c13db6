//! Post submission and the rate-limit backoff state machine.

mod format;
mod oauth;
mod twitter;

pub use format::{format_post, hashtag_line, make_hashtag};
pub use oauth::OAuthCredentials;
pub use twitter::{DryRunClient, TwitterClient};

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::forum::Topic;
use crate::state::CursorState;

/// Outcome of one submission attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishResult {
    /// The post went out and got this id.
    Success { post_id: String },
    /// The posting API refused until `reset_epoch` (epoch seconds).
    RateLimited { reset_epoch: i64 },
    /// Any other failure. The topic is skipped.
    TransientError(String),
}

/// A social media account that accepts text posts.
#[async_trait]
pub trait PostingApi: Send + Sync {
    async fn submit(&self, text: &str) -> PublishResult;
}

pub struct Publisher {
    api: Box<dyn PostingApi>,
    forum_base_url: String,
    account_handle: Option<String>,
    post_delay: Duration,
}

impl Publisher {
    #[must_use]
    pub fn new(api: Box<dyn PostingApi>, config: &Config) -> Self {
        Self {
            api,
            forum_base_url: config.forum_base_url.clone(),
            account_handle: config.social_account_handle.clone(),
            post_delay: config.post_delay,
        }
    }

    /// Publisher backed by the posting API the configuration selects.
    #[must_use]
    pub fn from_config(client: Client, config: &Config) -> Self {
        let api: Box<dyn PostingApi> = if config.dry_run {
            Box::new(DryRunClient)
        } else {
            Box::new(TwitterClient::new(
                client,
                &config.social_api_base,
                config.social_credentials.clone(),
            ))
        };
        Self::new(api, config)
    }

    /// Post `topic` and fold the outcome into `state`.
    ///
    /// On success the failure streak is cleared and the post delay is awaited. On a
    /// rate limit the cooldown is pushed out exponentially; the caller is expected to
    /// stop publishing for this run.
    pub async fn publish(&self, topic: &Topic, state: &mut CursorState, now: i64) -> PublishResult {
        let link = format!("{}topic/{}", self.forum_base_url, topic.id);
        let text = format_post(topic, &link);
        info!(tid = topic.id, "New thread:\n{text}");

        let result = self.api.submit(&text).await;
        match &result {
            PublishResult::Success { post_id } => {
                state.record_success();
                match &self.account_handle {
                    Some(handle) => info!(
                        tid = topic.id,
                        "Posted at https://twitter.com/{handle}/status/{post_id}"
                    ),
                    None => info!(tid = topic.id, post_id = %post_id, "Posted"),
                }
                tokio::time::sleep(self.post_delay).await;
            }
            PublishResult::RateLimited { reset_epoch } => {
                let sleep_time = state.record_rate_limit(*reset_epoch, now);
                error!(
                    tid = topic.id,
                    failures = state.failure_count,
                    reset_epoch,
                    now,
                    reset_time = state.reset_time,
                    "Rate limited, waiting for {} minutes",
                    sleep_time / 60
                );
            }
            PublishResult::TransientError(detail) => {
                warn!(tid = topic.id, "Error sending post: {detail}");
            }
        }
        result
    }
}
