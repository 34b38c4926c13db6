//! Topic discovery from the forum's recent-posts API.

mod fetcher;
mod models;

pub use fetcher::{FetchError, TopicFetcher};
pub use models::{PostCategory, PostTopic, PostUser, RecentPost, Topic, TopicTag};
