//! One invocation: load state, discover, filter, publish, persist.

use anyhow::{Context, Result};
use reqwest::Client;
use tracing::{debug, info};

use crate::config::Config;
use crate::constants::USER_AGENT;
use crate::filter::{ContentFilter, SuppressReason};
use crate::forum::TopicFetcher;
use crate::publisher::{PublishResult, Publisher};
use crate::state::CursorState;

/// What a single run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// The run stopped before any network activity because of a rate-limit cooldown.
    pub cooldown: bool,
    pub discovered: usize,
    pub published: usize,
    pub suppressed: usize,
    pub failed: usize,
    /// Publishing stopped early on a rate-limit response.
    pub rate_limited: bool,
    /// Cursor value written at the end of the run.
    pub last_seen_topic_id: i64,
}

/// Current time in epoch seconds.
#[must_use]
pub fn system_now() -> i64 {
    chrono::Utc::now().timestamp()
}

pub struct Reposter {
    config: Config,
    fetcher: TopicFetcher,
    filter: ContentFilter,
    publisher: Publisher,
    clock: fn() -> i64,
}

impl Reposter {
    #[must_use]
    pub fn new(
        config: Config,
        fetcher: TopicFetcher,
        filter: ContentFilter,
        publisher: Publisher,
    ) -> Self {
        Self {
            config,
            fetcher,
            filter,
            publisher,
            clock: system_now,
        }
    }

    /// Wire up the fetcher, filter and publisher from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client or the content filter cannot be built.
    pub async fn from_config(config: Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.http_timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;

        let fetcher = TopicFetcher::new(client.clone(), &config);
        let filter = ContentFilter::from_config(&config)
            .await
            .context("Failed to set up content filter")?;
        let publisher = Publisher::from_config(client, &config);

        Ok(Self::new(config, fetcher, filter, publisher))
    }

    /// Replace the time source.
    #[must_use]
    pub fn with_clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = clock;
        self
    }

    /// Run one fetch → filter → publish → persist cycle.
    ///
    /// # Errors
    ///
    /// Returns an error if the state file cannot be read or written, or if topic
    /// discovery fails under the `abort` fetch policy. Nothing is persisted in that case.
    pub async fn run_once(&self) -> Result<RunReport> {
        let path = &self.config.state_path;
        let mut state = CursorState::load(path)
            .await
            .context("Failed to load cursor state")?;
        let mut report = RunReport {
            last_seen_topic_id: state.last_seen_topic_id,
            ..RunReport::default()
        };

        let now = (self.clock)();
        if let Some(remaining) = state.cooldown_remaining(now) {
            info!(
                reset_time = state.reset_time,
                current_time = now,
                "Rate limited by posting API. Rate limited for {} minutes.",
                remaining / 60
            );
            report.cooldown = true;
            return Ok(report);
        }

        let topics = self
            .fetcher
            .discover_new_topics(state.last_seen_topic_id)
            .await
            .context("Failed to discover new topics")?;
        report.discovered = topics.len();
        if topics.is_empty() {
            info!("No new topics.");
        }

        // Oldest first, so posts go out in creation order.
        for topic in topics.iter().rev() {
            let verdict = self.filter.should_suppress(topic).await;
            if verdict.suppressed {
                report.suppressed += 1;
                match verdict.reason {
                    Some(SuppressReason::Profanity) => info!(
                        tid = topic.id,
                        terms = ?verdict.matched_terms,
                        "Filtered bad words, not posted"
                    ),
                    Some(SuppressReason::IgnoredCategory) => info!(
                        tid = topic.id,
                        category = %topic.category,
                        "Ignored category, not posted"
                    ),
                    Some(SuppressReason::ClassifierUnavailable) | None => info!(
                        tid = topic.id,
                        "Classifier unavailable, not posted"
                    ),
                }
                continue;
            }

            match self.publisher.publish(topic, &mut state, (self.clock)()).await {
                PublishResult::Success { .. } => report.published += 1,
                PublishResult::TransientError(_) => report.failed += 1,
                PublishResult::RateLimited { .. } => {
                    report.rate_limited = true;
                    break;
                }
            }
        }

        // The cursor moves to the newest topic seen, published or not.
        if let Some(newest) = topics.iter().map(|t| t.id).max() {
            state.advance_cursor(newest);
            info!(tid = state.last_seen_topic_id, "Saved most recent topic id");
        }

        state
            .save(path)
            .await
            .context("Failed to save cursor state")?;
        debug!(?report, "Run finished");

        report.last_seen_topic_id = state.last_seen_topic_id;
        Ok(report)
    }
}
