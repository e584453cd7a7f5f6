//! End-to-end tests: HTTP in, broker round trips through simulated backends, HTTP out.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use news_gateway::bridge::FinalResponse;
use reqwest::StatusCode;

mod common;
use common::{spawn_gateway, spawn_gateway_failing, start_programmable_backend, test_config, Reply};

fn recorder() -> Arc<Mutex<Vec<String>>> {
    Arc::new(Mutex::new(Vec::new()))
}

#[tokio::test]
async fn test_list_passes_command_and_reply_through() {
    let gw = spawn_gateway(test_config(Duration::from_secs(2))).await;
    let seen = recorder();
    let s = seen.clone();
    start_programmable_backend(&gw.broker, "news_input", move |command| {
        s.lock().unwrap().push(command.clone());
        async move {
            (command == "/newslist/?n=5&page=2").then(|| Reply::on("newslist", "X"))
        }
    });

    let res = gw.client.get(gw.url("/newslist/?page=2&n=5")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["content-type"], "application/json");
    assert!(res.headers().contains_key("x-request-id"));
    assert_eq!(res.text().await.unwrap(), "X");
    assert_eq!(*seen.lock().unwrap(), vec!["/newslist/?n=5&page=2".to_string()]);
}

#[tokio::test]
async fn test_list_defaults_without_trailing_slash() {
    let gw = spawn_gateway(test_config(Duration::from_secs(2))).await;
    let seen = recorder();
    let s = seen.clone();
    start_programmable_backend(&gw.broker, "news_input", move |command| {
        s.lock().unwrap().push(command);
        async { Some(Reply::on("newslist", "[]")) }
    });

    let res = gw.client.get(gw.url("/newslist?page=abc")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(*seen.lock().unwrap(), vec!["/newslist/?n=10&page=1".to_string()]);
}

#[tokio::test]
async fn test_filtered_list_orders_present_parameters() {
    let gw = spawn_gateway(test_config(Duration::from_secs(2))).await;
    let seen = recorder();
    let s = seen.clone();
    start_programmable_backend(&gw.broker, "news_input", move |command| {
        s.lock().unwrap().push(command);
        async { Some(Reply::on("filtered_content", "[{\"Title\":\"a\"}]")) }
    });

    let res = gw
        .client
        .get(gw.url("/newslist/filtered/?tags=rust&category=tech"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "[{\"Title\":\"a\"}]");
    assert_eq!(
        *seen.lock().unwrap(),
        vec!["newslist/filtered?category=tech&tags=rust&limit=10".to_string()]
    );
}

#[tokio::test]
async fn test_date_filter() {
    let gw = spawn_gateway(test_config(Duration::from_secs(2))).await;
    start_programmable_backend(&gw.broker, "news_input", |command| async move {
        (command == "newslist/filtered/?date=2024-05-01").then(|| Reply::on("filter_published", "dated"))
    });

    let res = gw.client.get(gw.url("/newslist/filtered/date")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Invalid date parameter");
    assert_eq!(gw.broker.published_count(), 0);

    let res = gw
        .client
        .get(gw.url("/newslist/filtered/date/?date=2024-05-01"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "dated");
}

#[tokio::test]
async fn test_detail_without_id_publishes_nothing() {
    let gw = spawn_gateway(test_config(Duration::from_secs(2))).await;

    for path in ["/newsdetail", "/newsdetail/?id="] {
        let res = gw.client.get(gw.url(path)).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "{path}");
    }
    assert_eq!(gw.broker.published_count(), 0);
}

#[tokio::test]
async fn test_detail_merges_both_legs() {
    let gw = spawn_gateway(test_config(Duration::from_secs(2))).await;
    start_programmable_backend(&gw.broker, "news_input", |command| async move {
        (command == "/newsdetail/42").then(|| Reply::on("newsdetail", "{\"Title\":\"Rust\"}"))
    });
    start_programmable_backend(&gw.broker, "comments_input", |command| async move {
        (command == "/comments/42")
            .then(|| Reply::on("comments", "[{\"comment\":\"nice\"}]").after(Duration::from_millis(50)))
    });

    let res = gw.client.get(gw.url("/newsdetail/?id=42")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let merged: FinalResponse = res.json().await.unwrap();
    assert_eq!(merged.news, "{\"Title\":\"Rust\"}");
    assert_eq!(merged.comments, "[{\"comment\":\"nice\"}]");
}

#[tokio::test]
async fn test_detail_waits_for_slow_leg_when_other_fails() {
    let gw = spawn_gateway_failing(test_config(Duration::from_secs(2)), &["comments_input"]).await;
    let delay = Duration::from_millis(300);
    start_programmable_backend(&gw.broker, "news_input", move |_| async move {
        Some(Reply::on("newsdetail", "Title: slow").after(delay))
    });

    let start = Instant::now();
    let res = gw.client.get(gw.url("/newsdetail?id=7")).send().await.unwrap();
    assert!(start.elapsed() >= delay);
    assert_eq!(res.status(), StatusCode::OK);

    let merged: FinalResponse = res.json().await.unwrap();
    assert_eq!(merged.news, "Title: slow");
    assert_eq!(merged.comments, "");
}

#[tokio::test]
async fn test_detail_fails_when_both_legs_fail() {
    let gw = spawn_gateway_failing(
        test_config(Duration::from_secs(2)),
        &["news_input", "comments_input"],
    )
    .await;

    let res = gw.client.get(gw.url("/newsdetail?id=7")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Failed to write message to broker");
}

#[tokio::test]
async fn test_kind_header_decides_field() {
    let gw = spawn_gateway(test_config(Duration::from_secs(2))).await;
    start_programmable_backend(&gw.broker, "news_input", |_| async {
        Some(Reply::on("newsdetail", "breaking story").kind("news"))
    });
    start_programmable_backend(&gw.broker, "comments_input", |_| async {
        Some(Reply::on("comments", "Title of a thread").kind("comments"))
    });

    let merged: FinalResponse = gw
        .client
        .get(gw.url("/newsdetail?id=1"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(merged.news, "breaking story");
    assert_eq!(merged.comments, "Title of a thread");
}

#[tokio::test]
async fn test_unanswered_request_times_out() {
    let gw = spawn_gateway(test_config(Duration::from_secs(1))).await;
    start_programmable_backend(&gw.broker, "comments_input", |_| async { None });

    let start = Instant::now();
    let res = gw.client.get(gw.url("/comments/?newsID=3")).send().await.unwrap();
    let elapsed = start.elapsed();

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(elapsed >= Duration::from_secs(1));
    assert!(elapsed < Duration::from_secs(3));
    assert_eq!(gw.broker.published_count(), 1);
}

#[tokio::test]
async fn test_concurrent_requests_get_their_own_replies() {
    let gw = Arc::new(spawn_gateway(test_config(Duration::from_secs(3))).await);
    // Earlier pages answer later, so replies arrive in reverse order.
    start_programmable_backend(&gw.broker, "news_input", |command| async move {
        let page: u64 = command
            .rsplit("page=")
            .next()
            .and_then(|p| p.parse().ok())
            .unwrap_or(1);
        Some(Reply::on("newslist", format!("page-{page}")).after(Duration::from_millis(250 - page * 40)))
    });

    let mut handles = Vec::new();
    for page in 1..=5u64 {
        let gw = gw.clone();
        handles.push(tokio::spawn(async move {
            let res = gw
                .client
                .get(gw.url(&format!("/newslist/?page={page}")))
                .send()
                .await
                .unwrap();
            (page, res.status(), res.text().await.unwrap())
        }));
    }

    for handle in handles {
        let (page, status, body) = handle.await.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, format!("page-{page}"));
    }
}

#[tokio::test]
async fn test_late_reply_is_not_delivered_to_next_request() {
    let gw = spawn_gateway(test_config(Duration::from_secs(1))).await;
    start_programmable_backend(&gw.broker, "news_input", |command| async move {
        let reply = if command.ends_with("page=1") {
            Reply::on("newslist", "page-1").after(Duration::from_millis(1200))
        } else {
            Reply::on("newslist", "page-2").after(Duration::from_millis(500))
        };
        Some(reply)
    });

    let res = gw.client.get(gw.url("/newslist/?page=1")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let res = gw.client.get(gw.url("/newslist/?page=2")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "page-2");
}

#[tokio::test]
async fn test_untagged_reply_resolves_waiting_request() {
    let gw = spawn_gateway(test_config(Duration::from_secs(2))).await;
    start_programmable_backend(&gw.broker, "comments_input", |command| async move {
        (command == "/comments/?newsID=9").then(|| Reply::on("comments", "[\"nine\"]").untagged())
    });

    let res = gw.client.get(gw.url("/comments?newsID=9")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "[\"nine\"]");
}

#[tokio::test]
async fn test_add_comment_is_created() {
    let gw = spawn_gateway(test_config(Duration::from_secs(2))).await;
    start_programmable_backend(&gw.broker, "add_comments", |command| async move {
        (command == "/add_comments/?comment=hello").then(|| Reply::on("comments", "{\"ok\":true}"))
    });

    let res = gw.client.post(gw.url("/addcomment/?comment=hello")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    assert_eq!(res.text().await.unwrap(), "{\"ok\":true}");

    let res = gw.client.post(gw.url("/addcomment/")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unavailable_broker_is_internal_error() {
    let gw = spawn_gateway(test_config(Duration::from_secs(2))).await;
    gw.broker.set_unavailable(true);

    let start = Instant::now();
    let res = gw.client.get(gw.url("/newslist/")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    // Publish failures do not wait for a reply.
    assert!(start.elapsed() < Duration::from_secs(1));
    assert_eq!(gw.broker.published_count(), 0);
}

#[tokio::test]
async fn test_root_banner_and_options() {
    let gw = spawn_gateway(test_config(Duration::from_secs(2))).await;

    let res = gw.client.get(gw.url("/")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "GoNews Server");

    let res = gw
        .client
        .request(reqwest::Method::OPTIONS, gw.url("/newsdetail"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    assert_eq!(res.headers()["allow"], "GET, OPTIONS");
}

#[tokio::test]
async fn test_request_without_consumer_fails_fast() {
    let gw = spawn_gateway(test_config(Duration::from_secs(2))).await;

    let start = Instant::now();
    let res = gw.client.get(gw.url("/comments/?newsID=3")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(start.elapsed() < Duration::from_secs(1));
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Failed to write message to broker");
    assert_eq!(gw.broker.published_count(), 0);
}

#[tokio::test]
async fn test_shutdown_drains_in_flight_request() {
    let mut gw = spawn_gateway(test_config(Duration::from_secs(2))).await;
    start_programmable_backend(&gw.broker, "news_input", |_| async {
        Some(Reply::on("newslist", "drained").after(Duration::from_millis(300)))
    });

    let client = gw.client.clone();
    let url = gw.url("/newslist/");
    let in_flight = tokio::spawn(async move {
        let res = client.get(url).send().await.unwrap();
        (res.status(), res.text().await.unwrap())
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    gw.begin_shutdown();

    let (status, body) = in_flight.await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "drained");

    gw.stopped().await.unwrap();
    assert_eq!(gw.pumps.receiver_count(), 0);
}
