use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::publisher::OAuthCredentials;

/// Cursor file used when `STATE_PATH` is unset.
pub const DEFAULT_STATE_PATH: &str = "./save_data.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
    #[error("failed to parse {name} as integer: {source}")]
    ParseInt {
        name: String,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("failed to parse {name} as boolean: {value}")]
    ParseBool { name: String, value: String },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Forum
    pub forum_base_url: String,
    pub max_pages: u32,
    pub page_delay: Duration,
    pub fetch_error_policy: FetchErrorPolicy,

    // Cursor state
    pub state_path: PathBuf,

    // Filtering
    pub ignore_categories: Vec<String>,
    pub profanity_words_file: Option<PathBuf>,
    pub profanity_classifier_cmd: Option<String>,

    // Posting
    pub social_api_base: String,
    pub social_credentials: OAuthCredentials,
    pub social_account_handle: Option<String>,
    pub post_delay: Duration,
    pub dry_run: bool,

    // HTTP
    pub http_timeout: Duration,
}

/// What to do with a recent-posts page that cannot be fetched or decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorPolicy {
    /// Log the failure, skip the page and keep scanning
    Skip,
    /// Fail the whole run
    Abort,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required environment variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let dry_run = parse_env_bool("DRY_RUN", false)?;
        let credential = |name: &str| {
            if dry_run {
                Ok(env_or_default(name, ""))
            } else {
                required_env(name)
            }
        };
        let social_credentials = OAuthCredentials {
            consumer_key: credential("SOCIAL_CONSUMER_KEY")?,
            consumer_secret: credential("SOCIAL_CONSUMER_SECRET")?,
            access_token: credential("SOCIAL_ACCESS_TOKEN")?,
            access_token_secret: credential("SOCIAL_ACCESS_TOKEN_SECRET")?,
        };

        Ok(Self {
            // Forum
            forum_base_url: normalize_base_url(&required_env("FORUM_BASE_URL")?),
            max_pages: parse_env_u32("MAX_PAGES", 5)?,
            page_delay: Duration::from_secs(parse_env_u64("PAGE_DELAY_SECS", 5)?),
            fetch_error_policy: parse_fetch_error_policy(&env_or_default(
                "FETCH_ERROR_POLICY",
                "skip",
            ))?,

            // Cursor state
            state_path: state_path_from_env(),

            // Filtering
            ignore_categories: parse_list(&env_or_default("IGNORE_CATEGORIES", "")),
            profanity_words_file: optional_env("PROFANITY_WORDS_FILE").map(PathBuf::from),
            profanity_classifier_cmd: optional_env("PROFANITY_CLASSIFIER_CMD"),

            // Posting
            social_api_base: env_or_default("SOCIAL_API_BASE", "https://api.twitter.com")
                .trim_end_matches('/')
                .to_string(),
            social_credentials,
            social_account_handle: optional_env("SOCIAL_ACCOUNT_HANDLE"),
            post_delay: Duration::from_secs(parse_env_u64("POST_DELAY_SECS", 20)?),
            dry_run,

            // HTTP
            http_timeout: Duration::from_secs(parse_env_u64("HTTP_TIMEOUT_SECS", 30)?),
        })
    }

    /// Configuration with no delays, for tests.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            forum_base_url: "http://127.0.0.1/".to_string(),
            max_pages: 5,
            page_delay: Duration::ZERO,
            fetch_error_policy: FetchErrorPolicy::Skip,
            state_path: PathBuf::from(DEFAULT_STATE_PATH),
            ignore_categories: Vec::new(),
            profanity_words_file: None,
            profanity_classifier_cmd: None,
            social_api_base: "http://127.0.0.1".to_string(),
            social_credentials: OAuthCredentials {
                consumer_key: "test-consumer-key".to_string(),
                consumer_secret: "test-consumer-secret".to_string(),
                access_token: "test-access-token".to_string(),
                access_token_secret: "test-access-token-secret".to_string(),
            },
            social_account_handle: None,
            post_delay: Duration::ZERO,
            dry_run: false,
            http_timeout: Duration::from_secs(10),
        }
    }

    /// Validate that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if url::Url::parse(&self.forum_base_url).is_err() {
            return Err(ConfigError::InvalidValue {
                name: "FORUM_BASE_URL".to_string(),
                message: format!("not a valid URL: '{}'", self.forum_base_url),
            });
        }
        if url::Url::parse(&self.social_api_base).is_err() {
            return Err(ConfigError::InvalidValue {
                name: "SOCIAL_API_BASE".to_string(),
                message: format!("not a valid URL: '{}'", self.social_api_base),
            });
        }
        if self.max_pages == 0 {
            return Err(ConfigError::InvalidValue {
                name: "MAX_PAGES".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if !self.dry_run {
            if let Some(name) = self.social_credentials.missing().first() {
                return Err(ConfigError::InvalidValue {
                    name: (*name).to_string(),
                    message: "cannot be empty".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Cursor file path from `STATE_PATH`, falling back to [`DEFAULT_STATE_PATH`].
#[must_use]
pub fn state_path_from_env() -> PathBuf {
    PathBuf::from(env_or_default("STATE_PATH", DEFAULT_STATE_PATH))
}

fn required_env(name: &str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_string()))
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_or_default(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_env_u64(name: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_u32(name: &str, default: u32) -> Result<u32, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_bool(name: &str, default: bool) -> Result<bool, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => match val.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::ParseBool {
                name: name.to_string(),
                value: val,
            }),
        },
        _ => Ok(default),
    }
}

fn parse_fetch_error_policy(value: &str) -> Result<FetchErrorPolicy, ConfigError> {
    match value.to_lowercase().as_str() {
        "skip" => Ok(FetchErrorPolicy::Skip),
        "abort" => Ok(FetchErrorPolicy::Abort),
        _ => Err(ConfigError::InvalidValue {
            name: "FETCH_ERROR_POLICY".to_string(),
            message: format!("must be 'skip' or 'abort', got '{value}'"),
        }),
    }
}

/// Split a comma-separated list. Entries are trimmed but otherwise kept verbatim,
/// since category matching is case-sensitive.
fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

fn normalize_base_url(url: &str) -> String {
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{url}/")
    }
}
