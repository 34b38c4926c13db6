//! Durable cursor state shared between invocations.
//!
//! The state file is a small JSON object, `{"tid": .., "reset_time": .., "failures": ..}`.
//! It is read once at the start of a run and written once at the end. Any failure to
//! read or write it is fatal: without a cursor there is no safe notion of "new".

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to read state file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse state file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write state file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("state file {0} already exists")]
    AlreadyExists(PathBuf),
}

/// Progress record persisted between runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorState {
    /// Newest topic id already handled. Never decreases.
    #[serde(rename = "tid")]
    pub last_seen_topic_id: i64,
    /// Epoch seconds before which a run must not touch the network.
    #[serde(default)]
    pub reset_time: i64,
    /// Consecutive rate-limit responses from the posting API.
    #[serde(rename = "failures", default)]
    pub failure_count: u32,
}

impl CursorState {
    /// Load state from `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, unreadable or not valid state JSON.
    pub async fn load(path: &Path) -> Result<Self, StateError> {
        let raw = tokio::fs::read(path).await.map_err(|source| StateError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let state: Self = serde_json::from_slice(&raw).map_err(|source| StateError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), ?state, "Loaded cursor state");
        Ok(state)
    }

    /// Persist state to `path`.
    ///
    /// Writes a sibling temp file first and renames it over the target, so a crash
    /// mid-write leaves the previous state intact.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub async fn save(&self, path: &Path) -> Result<(), StateError> {
        let write_err = |source| StateError::Write {
            path: path.to_path_buf(),
            source,
        };

        let body = serde_json::to_vec(self).map_err(|e| write_err(std::io::Error::other(e)))?;
        let tmp_path = temp_sibling(path);
        tokio::fs::write(&tmp_path, &body).await.map_err(write_err)?;
        tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;

        debug!(path = %path.display(), state = ?self, "Saved cursor state");
        Ok(())
    }

    /// Create a fresh state file with the cursor at `tid`.
    ///
    /// # Errors
    ///
    /// Returns an error if a state file already exists or cannot be written.
    pub async fn init(path: &Path, tid: i64) -> Result<Self, StateError> {
        if tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Err(StateError::AlreadyExists(path.to_path_buf()));
        }
        let state = Self {
            last_seen_topic_id: tid,
            ..Self::default()
        };
        state.save(path).await?;
        Ok(state)
    }

    /// Seconds left in the rate-limit cooldown, if one is in effect at `now`.
    #[must_use]
    pub fn cooldown_remaining(&self, now: i64) -> Option<i64> {
        let remaining = self.reset_time - now;
        (remaining > 0).then_some(remaining)
    }

    /// Move the cursor forward to `tid`. Lower ids are ignored.
    pub fn advance_cursor(&mut self, tid: i64) {
        self.last_seen_topic_id = self.last_seen_topic_id.max(tid);
    }

    /// A post went through; the backoff streak is over.
    pub fn record_success(&mut self) {
        self.failure_count = 0;
    }

    /// Apply exponential backoff after a rate-limit response.
    ///
    /// `sleep_time = (reset_epoch - now) * 2^failures + 1`, and the next allowed run
    /// is at `reset_epoch + sleep_time`. Returns `sleep_time`.
    pub fn record_rate_limit(&mut self, reset_epoch: i64, now: i64) -> i64 {
        let multiplier = 2_i64.saturating_pow(self.failure_count);
        let sleep_time = (reset_epoch - now)
            .saturating_mul(multiplier)
            .saturating_add(1);
        self.reset_time = reset_epoch.saturating_add(sleep_time);
        self.failure_count = self.failure_count.saturating_add(1);
        sleep_time
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(std::ffi::OsStr::to_os_string)
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
