//! Integration coverage for `HspClient` against a mock upstream (spec §4.1):
//! authentication, a 429 with a retry-after hint, and a one-shot
//! re-authenticate-and-retry on a 401 mid-phase.

use hsp_core::client::{HspClient, HspClientConfig};
use hsp_core::config::RetryConfig;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(base_url: String) -> HspClientConfig {
    HspClientConfig {
        base_url: base_url.clone(),
        fares_base_url: base_url,
        username: "user".to_string(),
        password: "pass".to_string(),
        retry: RetryConfig { max_attempts: 3, initial_delay_secs: 0.01, max_delay_secs: 0.05, backoff_multiplier: 2.0 },
    }
}

#[tokio::test]
async fn authenticate_returns_the_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/authenticate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "token": "tok-123" })))
        .mount(&server)
        .await;

    let client = HspClient::new(config(server.uri()));
    let token = client.authenticate().await.unwrap();
    assert_eq!(token, "tok-123");
}

#[tokio::test]
async fn service_details_retries_after_a_rate_limit_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/authenticate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "token": "tok-123" })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/serviceDetails"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "0"))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/serviceDetails"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "rid": "202512010930EUSMAN",
            "uid": "A12345",
            "headcode": "1A23",
            "operator_code": "VT",
            "scheduled_departure_date": "2025-12-01",
            "passenger_service": true,
            "stops": [],
        })))
        .with_priority(2)
        .mount(&server)
        .await;

    let client = HspClient::new(config(server.uri()));
    let details = client.fetch_service_details("202512010930EUSMAN").await.unwrap();
    assert_eq!(details.uid, "A12345");
}

#[tokio::test]
async fn a_rejected_token_triggers_exactly_one_reauthentication() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/authenticate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "token": "tok-first" })))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/authenticate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "token": "tok-second" })))
        .with_priority(2)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/serviceDetails"))
        .respond_with(ResponseTemplate::new(401))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/serviceDetails"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "rid": "202512010930EUSMAN",
            "uid": "A12345",
            "headcode": "1A23",
            "operator_code": "VT",
            "scheduled_departure_date": "2025-12-01",
            "passenger_service": true,
            "stops": [],
        })))
        .with_priority(2)
        .mount(&server)
        .await;

    let client = HspClient::new(config(server.uri()));
    client.authenticate().await.unwrap();
    let details = client.fetch_service_details("202512010930EUSMAN").await.unwrap();
    assert_eq!(details.uid, "A12345");
}
