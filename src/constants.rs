//! Shared constants used across the application.

/// User agent sent with every outbound request.
pub const USER_AGENT: &str = concat!("forum-reposter/", env!("CARGO_PKG_VERSION"));

/// Path of the forum's "recent posts of the day" listing, relative to the base URL.
pub const RECENT_POSTS_PATH: &str = "api/recent/posts/day";

/// Header the posting API uses to report when its rate-limit window resets (epoch seconds).
pub const RATE_LIMIT_RESET_HEADER: &str = "x-rate-limit-reset";

/// Assumed rate-limit window when a 429 arrives without a reset header.
pub const DEFAULT_RATE_LIMIT_WINDOW_SECS: i64 = 15 * 60;
