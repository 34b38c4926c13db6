//! Wire types for the forum's recent-posts listing and the topic record built from them.

use serde::Deserialize;

/// One entry of `GET /api/recent/posts/day`.
///
/// Replies come back in the same listing, so everything beyond the main-post flag and
/// topic id is optional here and only required once we know it is a main post.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentPost {
    #[serde(default)]
    pub is_main_post: bool,
    pub tid: i64,
    #[serde(default)]
    pub topic: Option<PostTopic>,
    #[serde(default)]
    pub user: Option<PostUser>,
    #[serde(default)]
    pub category: Option<PostCategory>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostTopic {
    /// HTML-escaped title.
    pub title_raw: String,
    #[serde(default)]
    pub tags: Vec<TopicTag>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TopicTag {
    pub value: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostUser {
    /// HTML-escaped display name.
    pub displayname: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostCategory {
    pub name: String,
}

/// A newly created topic, with HTML entities already decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub category: String,
    pub tags: Vec<String>,
}

impl RecentPost {
    /// Build a [`Topic`] from a main post.
    ///
    /// Returns `None` for replies and for main posts missing topic, user or category data.
    #[must_use]
    pub fn into_topic(self) -> Option<Topic> {
        if !self.is_main_post {
            return None;
        }
        let topic = self.topic?;
        let user = self.user?;
        let category = self.category?;

        Some(Topic {
            id: self.tid,
            title: unescape(&topic.title_raw),
            author: unescape(&user.displayname),
            category: unescape(&category.name),
            tags: topic.tags.iter().map(|t| unescape(&t.value)).collect(),
        })
    }
}

fn unescape(s: &str) -> String {
    html_escape::decode_html_entities(s).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAIN_POST: &str = r#"{
        "pid": 1001,
        "tid": 321,
        "isMainPost": true,
        "topic": {
            "titleRaw": "Coffee &amp; thyroid",
            "tags": [{"value": "cold-exposure_101", "valueEscaped": "cold-exposure_101"}]
        },
        "user": {"displayname": "Ray &quot;P&quot;"},
        "category": {"name": "Nutrition &amp; Diet"}
    }"#;

    #[test]
    fn test_main_post_into_topic_unescapes() {
        let post: RecentPost = serde_json::from_str(MAIN_POST).unwrap();
        let topic = post.into_topic().unwrap();

        assert_eq!(topic.id, 321);
        assert_eq!(topic.title, "Coffee & thyroid");
        assert_eq!(topic.author, "Ray \"P\"");
        assert_eq!(topic.category, "Nutrition & Diet");
        assert_eq!(topic.tags, vec!["cold-exposure_101".to_string()]);
    }

    #[test]
    fn test_reply_is_not_a_topic() {
        let post: RecentPost =
            serde_json::from_str(r#"{"tid": 5, "isMainPost": false}"#).unwrap();
        assert!(post.into_topic().is_none());
    }

    #[test]
    fn test_main_post_missing_user_is_skipped() {
        let post: RecentPost = serde_json::from_str(
            r#"{"tid": 5, "isMainPost": true, "topic": {"titleRaw": "x"}, "category": {"name": "c"}}"#,
        )
        .unwrap();
        assert!(post.into_topic().is_none());
    }
}
