//! Upstream client behavior against a mocked Titlovi.com API.

use std::time::Duration;

use serde_json::json;
use titlovi_gateway::types::{Credentials, SubtitleQuery};
use titlovi_gateway::{GatewayError, RetryConfig, TitloviClient, UpstreamConfig};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// Helpers
// ============================================================================

fn config(server: &MockServer) -> UpstreamConfig {
    UpstreamConfig::new()
        .api_url(format!("{}/api", server.uri()))
        .download_url(format!("{}/download", server.uri()))
        .retry(
            RetryConfig::new()
                .max_attempts(3)
                .delay(Duration::from_millis(10)),
        )
}

fn credentials() -> Credentials {
    Credentials::new("marko", "lozinka")
}

fn query() -> SubtitleQuery {
    SubtitleQuery::new("tt0111161").languages(["English"])
}

fn login_body(token: &str) -> serde_json::Value {
    json!({
        "Token": token,
        "UserId": 7,
        "UserName": "marko",
        "ExpirationDate": "2030-01-01T00:00:00"
    })
}

fn search_body() -> serde_json::Value {
    json!({
        "SubtitleResults": [
            {
                "Id": 101,
                "Title": "The Shawshank Redemption",
                "Link": "https://titlovi.com/download/?type=1&mediaid=101",
                "Lang": "English",
                "Type": 1
            },
            {
                "Id": 102,
                "Title": null,
                "Link": "https://titlovi.com/download/?type=1&mediaid=102",
                "Lang": "English",
                "Type": 1
            }
        ]
    })
}

async fn mount_login(server: &MockServer, token: &str, expected: u64) {
    Mock::given(method("POST"))
        .and(path("/api/gettoken"))
        .and(query_param("username", "marko"))
        .and(query_param("password", "lozinka"))
        .respond_with(ResponseTemplate::new(200).set_body_json(login_body(token)))
        .expect(expected)
        .mount(server)
        .await;
}

// ============================================================================
// Search
// ============================================================================

#[tokio::test]
async fn search_logs_in_once_and_reuses_session() {
    let server = MockServer::start().await;
    mount_login(&server, "t1", 1).await;
    Mock::given(method("GET"))
        .and(path("/api/search"))
        .and(query_param("token", "t1"))
        .and(query_param("userid", "7"))
        .and(query_param("query", "tt0111161"))
        .and(query_param("lang", "English"))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_body()))
        .expect(2)
        .mount(&server)
        .await;

    let client = TitloviClient::new(&config(&server)).unwrap();
    let first = client.search(&query(), &credentials()).await.unwrap();
    let second = client.search(&query(), &credentials()).await.unwrap();

    assert_eq!(first.len(), 2);
    assert_eq!(first, second);
    assert_eq!(first[0].id, 101);
    assert_eq!(first[0].media_type, 1);
    assert_eq!(first[1].title, "");
    server.verify().await;
}

#[tokio::test]
async fn unauthorized_search_relogs_once_and_retries_once() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/gettoken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(login_body("stale")))
        .up_to_n_times(1)
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/gettoken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(login_body("fresh")))
        .with_priority(2)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/search"))
        .and(query_param("token", "stale"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/search"))
        .and(query_param("token", "fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_body()))
        .expect(1)
        .mount(&server)
        .await;

    let client = TitloviClient::new(&config(&server)).unwrap();
    let results = client.search(&query(), &credentials()).await.unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(client.sessions().cached("marko").unwrap().token, "fresh");
    server.verify().await;
}

#[tokio::test]
async fn series_query_sends_season_episode_and_languages() {
    let server = MockServer::start().await;
    mount_login(&server, "t1", 1).await;
    Mock::given(method("GET"))
        .and(path("/api/search"))
        .and(query_param("query", "tt0944947"))
        .and(query_param("season", "1"))
        .and(query_param("episode", "2"))
        .and(query_param("lang", "English|Hrvatski"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "SubtitleResults": null })))
        .expect(1)
        .mount(&server)
        .await;

    let client = TitloviClient::new(&config(&server)).unwrap();
    let query = SubtitleQuery::from_video_id("tt0944947:1:2")
        .unwrap()
        .languages(["English", "Hrvatski"]);
    let results = client.search(&query, &credentials()).await.unwrap();

    assert!(results.is_empty());
    server.verify().await;
}

#[tokio::test]
async fn string_user_id_is_accepted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/gettoken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Token": "t1",
            "UserId": "42",
            "ExpirationDate": "not a date"
        })))
        .mount(&server)
        .await;

    let client = TitloviClient::new(&config(&server)).unwrap();
    let session = client.login(&credentials()).await.unwrap();

    assert_eq!(session.user_id, 42);
    assert!(session.expires_at.is_none());
}

#[tokio::test]
async fn exhausted_retries_surface_last_error() {
    let server = MockServer::start().await;
    mount_login(&server, "t1", 1).await;
    Mock::given(method("GET"))
        .and(path("/api/search"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let client = TitloviClient::new(&config(&server)).unwrap();
    let err = client.search(&query(), &credentials()).await.unwrap_err();

    assert!(matches!(err, GatewayError::Api { status: 503, .. }));
    assert_eq!(err.status_code(), 502);
    server.verify().await;
}

#[tokio::test]
async fn persistent_unauthorized_spends_the_attempt_budget() {
    let server = MockServer::start().await;
    // One initial login plus one refresh per attempt that still has a
    // successor; the last 401 is returned without logging in again.
    mount_login(&server, "t1", 3).await;
    Mock::given(method("GET"))
        .and(path("/api/search"))
        .respond_with(ResponseTemplate::new(401))
        .expect(3)
        .mount(&server)
        .await;

    let client = TitloviClient::new(&config(&server)).unwrap();
    let err = client.search(&query(), &credentials()).await.unwrap_err();

    assert_eq!(err, GatewayError::Unauthorized);
    assert_eq!(err.status_code(), 502);
    server.verify().await;
}

#[tokio::test]
async fn rejected_login_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/gettoken"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_body()))
        .expect(0)
        .mount(&server)
        .await;

    let client = TitloviClient::new(&config(&server)).unwrap();
    let err = client.search(&query(), &credentials()).await.unwrap_err();

    assert!(matches!(err, GatewayError::AuthenticationFailed(_)));
    assert!(client.sessions().is_empty());
    server.verify().await;
}

#[tokio::test]
async fn malformed_search_body_is_decode_error() {
    let server = MockServer::start().await;
    mount_login(&server, "t1", 1).await;
    Mock::given(method("GET"))
        .and(path("/api/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let client = TitloviClient::new(&config(&server)).unwrap();
    let err = client.search(&query(), &credentials()).await.unwrap_err();

    assert!(matches!(err, GatewayError::Decode(_)));
    server.verify().await;
}

// ============================================================================
// Download
// ============================================================================

#[tokio::test]
async fn download_returns_archive_bytes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/download/"))
        .and(query_param("type", "1"))
        .and(query_param("mediaid", "101"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"PK\x03\x04archive".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let client = TitloviClient::new(&config(&server)).unwrap();
    let bytes = client.download("1", "101").await.unwrap();

    assert_eq!(&bytes[..], b"PK\x03\x04archive");
    server.verify().await;
}

#[tokio::test]
async fn download_retries_transient_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/download/"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/download/"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"zip".to_vec()))
        .with_priority(2)
        .expect(1)
        .mount(&server)
        .await;

    let client = TitloviClient::new(&config(&server)).unwrap();
    let bytes = client.download("1", "101").await.unwrap();

    assert_eq!(&bytes[..], b"zip");
    server.verify().await;
}

#[test]
fn zero_attempt_budget_is_rejected() {
    let config = UpstreamConfig::new().retry(RetryConfig::new().max_attempts(0));
    assert!(matches!(
        TitloviClient::new(&config),
        Err(GatewayError::Configuration(_))
    ));
}
