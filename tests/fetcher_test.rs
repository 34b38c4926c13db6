//! Integration tests for topic discovery against a mocked recent-posts API.

use std::time::Duration;

use forum_reposter::config::{Config, FetchErrorPolicy};
use forum_reposter::forum::{FetchError, TopicFetcher};
use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RECENT_PATH: &str = "/api/recent/posts/day";

fn main_post(tid: i64) -> Value {
    json!({
        "pid": tid * 10,
        "tid": tid,
        "isMainPost": true,
        "topic": {"titleRaw": format!("Topic {tid}"), "tags": [{"value": "tag"}]},
        "user": {"displayname": "poster"},
        "category": {"name": "General"}
    })
}

fn reply(tid: i64) -> Value {
    json!({
        "pid": tid * 10 + 1,
        "tid": tid,
        "isMainPost": false,
        "topic": {"titleRaw": format!("Topic {tid}"), "tags": []},
        "user": {"displayname": "replier"},
        "category": {"name": "General"}
    })
}

fn fetcher(server: &MockServer, policy: FetchErrorPolicy) -> TopicFetcher {
    let config = Config {
        forum_base_url: format!("{}/", server.uri()),
        fetch_error_policy: policy,
        ..Config::for_testing()
    };
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap();
    TopicFetcher::new(client, &config)
}

fn fetcher_with_page_delay(server: &MockServer, page_delay: Duration) -> TopicFetcher {
    let config = Config {
        forum_base_url: format!("{}/", server.uri()),
        page_delay,
        ..Config::for_testing()
    };
    // No request timeout: paused time auto-advances while waiting on the socket.
    TopicFetcher::new(reqwest::Client::new(), &config)
}

async fn mount_page(server: &MockServer, page: u32, response: ResponseTemplate, times: u64) {
    Mock::given(method("GET"))
        .and(path(RECENT_PATH))
        .and(query_param("page", page.to_string()))
        .respond_with(response)
        .expect(times)
        .mount(server)
        .await;
}

fn ids(topics: &[forum_reposter::forum::Topic]) -> Vec<i64> {
    topics.iter().map(|t| t.id).collect()
}

#[tokio::test]
async fn test_stops_paginating_at_known_topic() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        1,
        ResponseTemplate::new(200).set_body_json(json!([main_post(14), reply(3), main_post(13)])),
        1,
    )
    .await;
    mount_page(
        &server,
        2,
        ResponseTemplate::new(200).set_body_json(json!([main_post(12), main_post(10), main_post(11)])),
        1,
    )
    .await;
    // A later page with higher ids must never be requested.
    mount_page(
        &server,
        3,
        ResponseTemplate::new(200).set_body_json(json!([main_post(99)])),
        0,
    )
    .await;

    let topics = fetcher(&server, FetchErrorPolicy::Skip)
        .discover_new_topics(10)
        .await
        .unwrap();

    assert_eq!(ids(&topics), vec![14, 13, 12]);
}

#[tokio::test]
async fn test_scans_at_most_five_pages() {
    let server = MockServer::start().await;
    for page in 1..=5_i64 {
        mount_page(
            &server,
            page as u32,
            ResponseTemplate::new(200)
                .set_body_json(json!([main_post(100 - page * 2), main_post(99 - page * 2)])),
            1,
        )
        .await;
    }
    mount_page(
        &server,
        6,
        ResponseTemplate::new(200).set_body_json(json!([main_post(1)])),
        0,
    )
    .await;

    let topics = fetcher(&server, FetchErrorPolicy::Skip)
        .discover_new_topics(0)
        .await
        .unwrap();

    assert_eq!(topics.len(), 10);
    assert_eq!(topics.first().map(|t| t.id), Some(98));
    assert_eq!(topics.last().map(|t| t.id), Some(89));
}

#[tokio::test]
async fn test_duplicate_topics_across_pages_are_collected_once() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        1,
        ResponseTemplate::new(200).set_body_json(json!([main_post(21), main_post(20)])),
        1,
    )
    .await;
    mount_page(
        &server,
        2,
        ResponseTemplate::new(200).set_body_json(json!([main_post(20), main_post(5)])),
        1,
    )
    .await;

    let topics = fetcher(&server, FetchErrorPolicy::Skip)
        .discover_new_topics(5)
        .await
        .unwrap();

    assert_eq!(ids(&topics), vec![21, 20]);
}

#[tokio::test]
async fn test_skip_policy_continues_past_bad_page() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        1,
        ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"),
        1,
    )
    .await;
    mount_page(&server, 2, ResponseTemplate::new(502), 1).await;
    mount_page(
        &server,
        3,
        ResponseTemplate::new(200).set_body_json(json!([main_post(8), main_post(7)])),
        1,
    )
    .await;

    let topics = fetcher(&server, FetchErrorPolicy::Skip)
        .discover_new_topics(7)
        .await
        .unwrap();

    assert_eq!(ids(&topics), vec![8]);
}

#[tokio::test]
async fn test_abort_policy_fails_on_bad_page() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        1,
        ResponseTemplate::new(200).set_body_string("{not json"),
        1,
    )
    .await;
    mount_page(
        &server,
        2,
        ResponseTemplate::new(200).set_body_json(json!([main_post(8)])),
        0,
    )
    .await;

    let err = fetcher(&server, FetchErrorPolicy::Abort)
        .discover_new_topics(0)
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Decode { .. }), "got {err:?}");
}

#[tokio::test]
async fn test_abort_policy_fails_on_error_status() {
    let server = MockServer::start().await;
    mount_page(&server, 1, ResponseTemplate::new(500), 1).await;

    let err = fetcher(&server, FetchErrorPolicy::Abort)
        .discover_new_topics(0)
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Status { .. }), "got {err:?}");
}

#[tokio::test]
async fn test_html_entities_are_decoded() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        1,
        ResponseTemplate::new(200).set_body_json(json!([
            {
                "tid": 3,
                "isMainPost": true,
                "topic": {"titleRaw": "Salt &amp; sugar", "tags": [{"value": "a&amp;b"}]},
                "user": {"displayname": "O&#39;Brien"},
                "category": {"name": "Q&amp;A"}
            },
            main_post(1)
        ])),
        1,
    )
    .await;

    let topics = fetcher(&server, FetchErrorPolicy::Skip)
        .discover_new_topics(1)
        .await
        .unwrap();

    assert_eq!(topics.len(), 1);
    let topic = &topics[0];
    assert_eq!(topic.title, "Salt & sugar");
    assert_eq!(topic.author, "O'Brien");
    assert_eq!(topic.category, "Q&A");
    assert_eq!(topic.tags, vec!["a&b".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_waits_page_delay_before_each_page() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        1,
        ResponseTemplate::new(200).set_body_json(json!([main_post(22), main_post(21)])),
        1,
    )
    .await;
    mount_page(
        &server,
        2,
        ResponseTemplate::new(200).set_body_json(json!([main_post(20), main_post(19)])),
        1,
    )
    .await;

    let start = tokio::time::Instant::now();
    let topics = fetcher_with_page_delay(&server, Duration::from_secs(5))
        .discover_new_topics(19)
        .await
        .unwrap();

    assert_eq!(ids(&topics), vec![22, 21, 20]);
    assert!(start.elapsed() >= Duration::from_secs(10));
}
