use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{OAuthCredentials, PostingApi, PublishResult};
use crate::constants::{DEFAULT_RATE_LIMIT_WINDOW_SECS, RATE_LIMIT_RESET_HEADER};

#[derive(Debug, Serialize)]
struct CreateTweetRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct CreateTweetResponse {
    data: CreatedTweet,
}

#[derive(Debug, Deserialize)]
struct CreatedTweet {
    id: String,
}

/// X (Twitter) API v2 client. Requests are OAuth 1.0a signed with the account's
/// static user-context keys.
pub struct TwitterClient {
    client: Client,
    api_base: String,
    credentials: OAuthCredentials,
}

impl TwitterClient {
    #[must_use]
    pub fn new(client: Client, api_base: &str, credentials: OAuthCredentials) -> Self {
        Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            credentials,
        }
    }
}

#[async_trait]
impl PostingApi for TwitterClient {
    async fn submit(&self, text: &str) -> PublishResult {
        let url = format!("{}/2/tweets", self.api_base);

        let response = match self
            .client
            .post(&url)
            .header(
                reqwest::header::AUTHORIZATION,
                self.credentials.authorization("POST", &url),
            )
            .json(&CreateTweetRequest { text })
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return PublishResult::TransientError(format!("request failed: {e}")),
        };

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let reset_epoch = response
                .headers()
                .get(RATE_LIMIT_RESET_HEADER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<i64>().ok())
                .unwrap_or_else(|| {
                    debug!("Rate limited without a reset header, assuming a full window");
                    chrono::Utc::now().timestamp() + DEFAULT_RATE_LIMIT_WINDOW_SECS
                });
            return PublishResult::RateLimited { reset_epoch };
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return PublishResult::TransientError(format!("HTTP {status}: {body}"));
        }

        match response.json::<CreateTweetResponse>().await {
            Ok(created) => {
                info!(post_id = %created.data.id, "Post created");
                PublishResult::Success {
                    post_id: created.data.id,
                }
            }
            Err(e) => PublishResult::TransientError(format!("unexpected response body: {e}")),
        }
    }
}

/// Logs the post instead of sending it.
pub struct DryRunClient;

#[async_trait]
impl PostingApi for DryRunClient {
    async fn submit(&self, text: &str) -> PublishResult {
        info!(text = %text, "Dry run, not posting");
        PublishResult::Success {
            post_id: format!("dry-run-{}", chrono::Utc::now().timestamp_millis()),
        }
    }
}
