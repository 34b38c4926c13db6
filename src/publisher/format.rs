//! Turns a topic into post text.

use crate::forum::Topic;

/// Compose the post:
///
/// ```text
/// {title}
/// {link}
/// {category} || {author}
/// {hashtags}
/// ```
#[must_use]
pub fn format_post(topic: &Topic, link: &str) -> String {
    format!(
        "{}\n{link}\n{} || {}\n{}",
        topic.title,
        topic.category,
        topic.author,
        hashtag_line(&topic.tags)
    )
}

/// Space-separated hashtags for `tags`, skipping tags that produce no words.
#[must_use]
pub fn hashtag_line(tags: &[String]) -> String {
    tags.iter()
        .filter_map(|t| make_hashtag(t))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split on runs of non-alphanumerics (underscore included), capitalize each word and
/// glue them together: `cold-exposure_101` becomes `#ColdExposure101`.
#[must_use]
pub fn make_hashtag(tag: &str) -> Option<String> {
    let body: String = tag
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(capitalize)
        .collect();

    if body.is_empty() {
        None
    } else {
        Some(format!("#{body}"))
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
    })
}
