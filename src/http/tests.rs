//! Tests for the HTTP client module

use super::*;
use crate::config::ApiKey;
use crate::error::{Error, ErrorKind};
use crate::types::{JsonValue, Method, StringMap};
use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use test_case::test_case;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FAST_RETRY: Duration = Duration::from_millis(5);

fn config_for(server: &MockServer) -> HttpClientConfigBuilder {
    HttpClientConfig::builder(format!("{}/v0", server.uri()), ApiKey::new("keyTest"))
}

fn fast_retry(max_retries: u32) -> RetryPolicy {
    RetryPolicy::bounded(max_retries, FAST_RETRY, FAST_RETRY)
}

/// Transport replaying canned outcomes and recording every request
#[derive(Default)]
struct ScriptedTransport {
    outcomes: Mutex<VecDeque<std::result::Result<TransportResponse, TransportError>>>,
    requests: Mutex<Vec<TransportRequest>>,
}

impl ScriptedTransport {
    fn with(outcomes: Vec<std::result::Result<TransportResponse, TransportError>>) -> Arc<Self> {
        Arc::new(Self {
            outcomes: Mutex::new(outcomes.into()),
            requests: Mutex::default(),
        })
    }

    fn sent(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(
        &self,
        request: TransportRequest,
    ) -> std::result::Result<TransportResponse, TransportError> {
        self.requests.lock().unwrap().push(request);
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::new("script exhausted")))
    }
}

fn response(status: u16, body: &str) -> std::result::Result<TransportResponse, TransportError> {
    Ok(TransportResponse {
        status,
        headers: Default::default(),
        body: body.as_bytes().to_vec(),
    })
}

fn scripted_client(
    retry: RetryPolicy,
    outcomes: Vec<std::result::Result<TransportResponse, TransportError>>,
) -> (HttpClient, Arc<ScriptedTransport>) {
    let transport = ScriptedTransport::with(outcomes);
    let config = HttpClientConfig::builder("https://api.test/v0", ApiKey::new("keyTest"))
        .retry(retry)
        .build();
    let client = HttpClient::with_transport(config, transport.clone());
    (client, transport)
}

fn api_kind(err: &Error) -> ErrorKind {
    err.kind().cloned().expect("expected an API error")
}

// ============================================================================
// Backoff
// ============================================================================

#[test]
fn test_backoff_defaults() {
    let backoff = Backoff::default();
    assert_eq!(backoff.initial_delay, Duration::from_millis(1000));
    assert_eq!(backoff.max_delay, Duration::from_millis(45_000));
}

#[test_case(0, 1_000 ; "first retry")]
#[test_case(1, 2_000 ; "second retry")]
#[test_case(4, 16_000 ; "fifth retry")]
#[test_case(6, 45_000 ; "clipped to max")]
#[test_case(40, 45_000 ; "saturating exponent")]
fn test_backoff_ceiling(attempt: u32, expected_ms: u64) {
    let backoff = Backoff::default();
    assert_eq!(backoff.ceiling(attempt), Duration::from_millis(expected_ms));
}

#[test]
fn test_compute_delay_within_ceiling() {
    let backoff = Backoff::default();
    for attempt in 0..8 {
        let ceiling = backoff.ceiling(attempt);
        for _ in 0..50 {
            let delay = compute_delay(attempt, &backoff);
            assert!(delay <= ceiling, "{delay:?} > {ceiling:?}");
        }
    }
}

#[test]
fn test_compute_delay_is_jittered() {
    let backoff = Backoff::default();
    let mut delays: Vec<Duration> = (0..20).map(|_| compute_delay(3, &backoff)).collect();
    delays.dedup();
    assert!(delays.len() > 1);
}

#[test]
fn test_retry_policy_backoff_for() {
    assert!(RetryPolicy::Disabled.backoff_for(0).is_none());
    assert!(RetryPolicy::default().backoff_for(1_000).is_some());

    let bounded = fast_retry(2);
    assert!(bounded.backoff_for(0).is_some());
    assert!(bounded.backoff_for(1).is_some());
    assert!(bounded.backoff_for(2).is_none());
    assert_eq!(bounded.max_retries(), Some(2));
    assert_eq!(RetryPolicy::default().max_retries(), None);
    assert!(!RetryPolicy::Disabled.is_enabled());
}

// ============================================================================
// Classification
// ============================================================================

#[test_case(401, ErrorKind::AuthenticationRequired, "You should provide valid api key to perform this operation")]
#[test_case(403, ErrorKind::NotAuthorized, "You are not authorized to perform this operation")]
#[test_case(404, ErrorKind::NotFound, "Could not find what you are looking for")]
#[test_case(413, ErrorKind::RequestTooLarge, "Request body is too large")]
#[test_case(422, ErrorKind::UnprocessableEntity, "The operation cannot be processed")]
#[test_case(429, ErrorKind::TooManyRequests, "You have made too many requests in a short period of time. Please retry your request later")]
#[test_case(500, ErrorKind::ServerError, "Try again. If the problem persists, contact support.")]
#[test_case(503, ErrorKind::ServiceUnavailable, "The service is temporarily unavailable. Please retry shortly.")]
fn test_classify_fixed_statuses(status: u16, kind: ErrorKind, message: &str) {
    let err = classify(status, Some(&json!({})));
    assert_eq!(err.kind, kind);
    assert_eq!(err.message, message);
    assert_eq!(err.status, Some(status));
}

#[test_case(401, ErrorKind::AuthenticationRequired, "You should provide valid api key to perform this operation")]
#[test_case(403, ErrorKind::NotAuthorized, "You are not authorized to perform this operation")]
#[test_case(413, ErrorKind::RequestTooLarge, "Request body is too large")]
#[test_case(429, ErrorKind::TooManyRequests, "You have made too many requests in a short period of time. Please retry your request later")]
#[test_case(500, ErrorKind::ServerError, "Try again. If the problem persists, contact support.")]
#[test_case(503, ErrorKind::ServiceUnavailable, "The service is temporarily unavailable. Please retry shortly.")]
fn test_classify_fixed_statuses_ignore_body(status: u16, kind: ErrorKind, message: &str) {
    let body = json!({"error": {"type": "CUSTOM_TYPE", "message": "server supplied message"}});
    let err = classify(status, Some(&body));
    assert_eq!(err.kind, kind);
    assert_eq!(err.message, message);
    assert_eq!(err.body, Some(body));
}

#[test]
fn test_classify_unprocessable_without_body() {
    let err = classify(422, None);
    assert_eq!(err.kind, ErrorKind::UnprocessableEntity);
    assert_eq!(err.message, "The operation cannot be processed");
    assert!(err.body.is_none());
}

#[test]
fn test_classify_unprocessable_custom_type() {
    let body = json!({"error": {"type": "CUSTOM", "message": "m"}});
    let err = classify(422, Some(&body));
    assert_eq!(err.kind, ErrorKind::Other("CUSTOM".into()));
    assert_eq!(err.message, "m");
}

#[test]
fn test_classify_default_keeps_body_type_and_message() {
    let body = json!({"error": {"type": "X", "message": "m"}});
    let err = classify(400, Some(&body));
    assert_eq!(err.kind, ErrorKind::Other("X".into()));
    assert_eq!(err.message, "m");
    assert_eq!(err.status, Some(400));
}

#[test]
fn test_classify_not_found_uses_body_message() {
    let body = json!({"error": {"type": "NOT_FOUND", "message": "Could not find table Tasks"}});
    let err = classify(404, Some(&body));
    assert_eq!(err.kind, ErrorKind::NotFound);
    assert_eq!(err.message, "Could not find table Tasks");
    assert_eq!(err.body, Some(body));
}

#[test]
fn test_classify_flat_body() {
    let body = json!({"type": "NOT_FOUND", "message": "Record gone"});
    let err = classify(404, Some(&body));
    assert_eq!(err.message, "Record gone");
}

#[test]
fn test_classify_unprocessable_keeps_server_type() {
    let body = json!({"error": {"type": "INVALID_REQUEST_UNKNOWN", "message": "Bad field"}});
    let err = classify(422, Some(&body));
    assert_eq!(err.kind, ErrorKind::Other("INVALID_REQUEST_UNKNOWN".into()));
    assert_eq!(err.kind.as_str(), "INVALID_REQUEST_UNKNOWN");
    assert_eq!(err.message, "Bad field");
}

#[test]
fn test_classify_iterator_expired() {
    let body = json!({"error": {"type": "LIST_RECORDS_ITERATOR_NOT_AVAILABLE", "message": "expired"}});
    let err: Error = classify(422, Some(&body)).into();
    assert!(err.is_iterator_expired());
}

#[test]
fn test_classify_default_with_body() {
    let err = classify(418, Some(&json!({"weird": true})));
    assert_eq!(err.kind, ErrorKind::UnexpectedError);
    assert_eq!(err.message, "An unexpected error occurred");

    let err = classify(400, Some(&json!({"error": "INVALID_REQUEST"})));
    assert_eq!(err.kind, ErrorKind::Other("INVALID_REQUEST".into()));
}

#[test]
fn test_classify_default_without_body() {
    let err = classify(502, None);
    assert_eq!(err.kind, ErrorKind::UnexpectedError);
    assert_eq!(
        err.message,
        "The response from Airtable was invalid JSON. Please try again soon."
    );
    assert!(err.body.is_none());
}

// ============================================================================
// Request descriptors
// ============================================================================

fn cursor(pairs: &[(&str, &str)]) -> StringMap {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

#[test]
fn test_with_cursor_get_merges_into_query() {
    let desc = RequestDescriptor::new("meta/bases").query("pageSize", 10);
    let next = desc.with_cursor(&cursor(&[("offset", "itr1")]));

    assert_eq!(next.query.get("offset"), Some(&json!("itr1")));
    assert_eq!(next.query.get("pageSize"), Some(&json!(10)));
    assert!(next.body.is_none());
    // the source descriptor is untouched
    assert!(desc.query.get("offset").is_none());
}

#[test]
fn test_with_cursor_post_merges_into_body() {
    let desc = RequestDescriptor::with_method(Method::POST, "app/tbl/listRecords")
        .json(json!({"view": "Grid", "offset": "stale"}));
    let next = desc.with_cursor(&cursor(&[("offset", "itr2")]));

    assert_eq!(next.body, Some(json!({"view": "Grid", "offset": "itr2"})));
    assert!(next.query.is_empty());
}

#[test]
fn test_with_cursor_post_without_body() {
    let desc = RequestDescriptor::with_method(Method::POST, "app/tbl/listRecords");
    let next = desc.with_cursor(&cursor(&[("offset", "itr3")]));
    assert_eq!(next.body, Some(json!({"offset": "itr3"})));
}

#[test]
fn test_with_empty_cursor_is_identity() {
    let desc = RequestDescriptor::with_method(Method::POST, "x").json(json!({"a": 1}));
    assert_eq!(desc.with_cursor(&StringMap::new()), desc);
}

#[test]
fn test_without_param_removes_from_query_and_body() {
    let desc = RequestDescriptor::with_method(Method::POST, "x")
        .query("pageSize", 5)
        .json(json!({"pageSize": 5, "view": "v"}));
    let stripped = desc.without_param("pageSize");
    assert!(stripped.query.is_empty());
    assert_eq!(stripped.body, Some(json!({"view": "v"})));
}

#[test]
fn test_query_pairs_render_arrays_and_scalars() {
    let desc = RequestDescriptor::new("x")
        .query("records", json!(["rec1", "rec2"]))
        .query("pageSize", 3)
        .query("typecast", true)
        .query("skipped", JsonValue::Null);
    let mut pairs = desc.query_pairs();
    pairs.sort();
    assert_eq!(
        pairs,
        vec![
            ("pageSize".to_string(), "3".to_string()),
            ("records[]".to_string(), "rec1".to_string()),
            ("records[]".to_string(), "rec2".to_string()),
            ("typecast".to_string(), "true".to_string()),
        ]
    );
}

#[test]
fn test_attempt_state_counts_sends() {
    let mut state = AttemptState::new();
    assert_eq!(state.current_attempt(), None);
    assert_eq!(state.begin_send(), 0);
    assert_eq!(state.begin_send(), 1);
    assert_eq!(state.current_attempt(), Some(1));
    assert_eq!(state.sends(), 2);
}

// ============================================================================
// Client against a mock server
// ============================================================================

#[test]
fn test_http_client_config_builder() {
    let config = HttpClientConfig::builder("https://api.test/v0", ApiKey::new("k"))
        .timeout(Duration::from_secs(5))
        .retry(RetryPolicy::Disabled)
        .header("X-Custom", "value")
        .user_agent("test-agent/1.0")
        .rate_limit(RateLimiterConfig::per_base())
        .build();

    assert_eq!(config.timeout, Duration::from_secs(5));
    assert_eq!(config.retry, RetryPolicy::Disabled);
    assert_eq!(config.custom_headers.get("X-Custom"), Some(&"value".to_string()));
    assert_eq!(config.user_agent, "test-agent/1.0");
    assert!(config.rate_limit.is_some());
    assert!(!format!("{config:?}").contains("\"k\""));
}

#[tokio::test]
async fn test_execute_sends_bearer_auth_and_parses_json() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v0/meta/whoami"))
        .and(header("Authorization", "Bearer keyTest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "usr1"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::new(config_for(&server).build()).unwrap();
    let body = client
        .execute(&RequestDescriptor::new("/meta/whoami"))
        .await
        .unwrap();
    assert_eq!(body, json!({"id": "usr1"}));
}

#[tokio::test]
async fn test_execute_sends_query_and_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v0/app1/tbl1/listRecords"))
        .and(query_param("typecast", "true"))
        .and(body_json(json!({"view": "Grid"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"records": []})))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::new(config_for(&server).build()).unwrap();
    let desc = RequestDescriptor::with_method(Method::POST, "app1/tbl1/listRecords")
        .query("typecast", true)
        .json(json!({"view": "Grid"}));
    tokio_test::assert_ok!(client.execute(&desc).await);
}

#[tokio::test]
async fn test_custom_headers_override_case_insensitively() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v0/meta/bases"))
        .and(header("authorization", "Bearer override"))
        .and(header("x-trace", "per-call"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"bases": []})))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&server)
        .header("Authorization", "Bearer override")
        .header("X-Trace", "client")
        .build();
    let client = HttpClient::new(config).unwrap();
    let desc = RequestDescriptor::new("meta/bases").header("x-trace", "per-call");
    client.execute(&desc).await.unwrap();
}

#[tokio::test]
async fn test_rate_limited_then_success_resends() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v0/meta/whoami"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({})))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v0/meta/whoami"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "usr1"})))
        .with_priority(2)
        .mount(&server)
        .await;

    let client = HttpClient::new(config_for(&server).retry(fast_retry(5)).build()).unwrap();
    let mut state = AttemptState::new();
    let body = client
        .execute_with_state(&RequestDescriptor::new("meta/whoami"), &mut state)
        .await
        .unwrap();

    assert_eq!(body["id"], "usr1");
    assert_eq!(state.sends(), 3);
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_rate_limited_without_retry_fails_immediately() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::new(config_for(&server).retry(RetryPolicy::Disabled).build()).unwrap();
    let err = client
        .execute(&RequestDescriptor::new("meta/whoami"))
        .await
        .unwrap_err();

    assert_eq!(api_kind(&err), ErrorKind::TooManyRequests);
    assert_eq!(err.status(), Some(429));
}

#[tokio::test]
async fn test_rate_limited_bounded_retries_exhaust() {
    let (client, transport) = scripted_client(
        fast_retry(2),
        vec![response(429, ""), response(429, ""), response(429, "")],
    );

    let mut state = AttemptState::new();
    let err = client
        .execute_with_state(&RequestDescriptor::new("meta/whoami"), &mut state)
        .await
        .unwrap_err();

    assert_eq!(api_kind(&err), ErrorKind::TooManyRequests);
    assert_eq!(transport.sent(), 3);
    assert_eq!(state.current_attempt(), Some(2));
}

#[tokio::test]
async fn test_zero_max_retries_sends_once() {
    let (client, transport) = scripted_client(fast_retry(0), vec![response(429, "")]);
    let err = client
        .execute(&RequestDescriptor::new("x"))
        .await
        .unwrap_err();
    assert_eq!(api_kind(&err), ErrorKind::TooManyRequests);
    assert_eq!(transport.sent(), 1);
}

#[tokio::test]
async fn test_other_errors_are_not_retried() {
    let (client, transport) = scripted_client(
        RetryPolicy::default(),
        vec![response(503, r#"{"error":{"type":"SERVICE_UNAVAILABLE"}}"#)],
    );
    let err = client
        .execute(&RequestDescriptor::new("x"))
        .await
        .unwrap_err();
    assert_eq!(api_kind(&err), ErrorKind::ServiceUnavailable);
    assert_eq!(transport.sent(), 1);
}

#[tokio::test]
async fn test_transport_failure_is_connection_error_and_not_retried() {
    let (client, transport) = scripted_client(
        RetryPolicy::default(),
        vec![Err(TransportError::new("connection refused"))],
    );
    let err = client
        .execute(&RequestDescriptor::new("x"))
        .await
        .unwrap_err();

    assert!(err.is_connection_error());
    assert_eq!(err.status(), None);
    assert_eq!(transport.sent(), 1);
}

#[tokio::test]
async fn test_unreachable_host_is_connection_error() {
    let config = HttpClientConfig::builder("http://127.0.0.1:1/v0", ApiKey::new("k")).build();
    let client = HttpClient::new(config).unwrap();
    let err = client
        .execute(&RequestDescriptor::new("meta/whoami"))
        .await
        .unwrap_err();
    assert!(err.is_connection_error());
}

#[tokio::test]
async fn test_timeout_is_connection_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({}))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let client = HttpClient::new(
        config_for(&server)
            .timeout(Duration::from_millis(50))
            .build(),
    )
    .unwrap();
    let err = client
        .execute(&RequestDescriptor::new("meta/whoami"))
        .await
        .unwrap_err();

    assert!(err.is_connection_error());
    assert!(err.to_string().contains("timed out after 50ms"));
}

#[tokio::test]
async fn test_timeout_covers_retry_sleeps() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let config = config_for(&server)
        .retry(RetryPolicy::Unbounded(Backoff::new(
            Duration::from_millis(20),
            Duration::from_millis(20),
        )))
        .timeout(Duration::from_millis(150))
        .build();
    let client = HttpClient::new(config).unwrap();
    let err = client
        .execute(&RequestDescriptor::new("meta/whoami"))
        .await
        .unwrap_err();

    assert!(err.is_connection_error());
}

#[tokio::test]
async fn test_success_with_invalid_json_is_unexpected_error() {
    let (client, _) = scripted_client(RetryPolicy::default(), vec![response(200, "<html>")]);
    let err = client
        .execute(&RequestDescriptor::new("x"))
        .await
        .unwrap_err();
    assert_eq!(api_kind(&err), ErrorKind::UnexpectedError);
    assert_eq!(err.status(), Some(200));
}

#[tokio::test]
async fn test_success_with_empty_body_is_null() {
    let (client, _) = scripted_client(RetryPolicy::default(), vec![response(204, "")]);
    let body = client.execute(&RequestDescriptor::new("x")).await.unwrap();
    assert_eq!(body, JsonValue::Null);
}

#[tokio::test]
async fn test_error_body_is_attached() {
    let (client, _) = scripted_client(
        RetryPolicy::default(),
        vec![response(404, r#"{"error":{"type":"NOT_FOUND","message":"No such base"}}"#)],
    );
    let err = client
        .execute(&RequestDescriptor::new("x"))
        .await
        .unwrap_err();
    match err {
        Error::Api(api) => {
            assert_eq!(api.message, "No such base");
            assert_eq!(api.body.unwrap()["error"]["type"], "NOT_FOUND");
        }
        other => panic!("expected API error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_absolute_urls_pass_through() {
    let (client, transport) =
        scripted_client(RetryPolicy::default(), vec![response(200, "{}")]);
    client
        .execute(&RequestDescriptor::new("https://content.test/v0/upload"))
        .await
        .unwrap();
    let sent = transport.requests.lock().unwrap();
    assert_eq!(sent[0].url, "https://content.test/v0/upload");
    assert!(sent[0]
        .headers
        .iter()
        .any(|(k, v)| k == "Authorization" && v == "Bearer keyTest"));
}

#[tokio::test]
async fn test_rate_limiter_is_applied() {
    let config = HttpClientConfig::builder("https://api.test/v0", ApiKey::new("k"))
        .rate_limit(RateLimiterConfig::new(100, 1))
        .build();
    let transport = ScriptedTransport::with(vec![response(200, "{}"), response(200, "{}")]);
    let client = HttpClient::with_transport(config, transport.clone());
    assert!(client.has_rate_limiter());

    client.execute(&RequestDescriptor::new("a")).await.unwrap();
    client.execute(&RequestDescriptor::new("b")).await.unwrap();
    assert_eq!(transport.sent(), 2);
}
