//! Unit tests for request building and response classification

use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER};
use reqwest::StatusCode;
use std::time::Duration;

use slack_thread_downloader::downloader::config::DEFAULT_RETRY_AFTER;
use slack_thread_downloader::fetcher::slack_http::{classify_payload, parse_retry_after};
use slack_thread_downloader::fetcher::{ApiCall, FetchOutcome};

#[test]
fn test_api_call_builder() {
    let call = ApiCall::new("conversations.history")
        .param("channel", "C01")
        .param("limit", "1000");

    assert_eq!(call.method, "conversations.history");
    assert_eq!(call.params.len(), 2);
    assert_eq!(call.params[0], ("channel", "C01".to_string()));
}

#[test]
fn test_with_cursor_leaves_base_untouched() {
    let base = ApiCall::new("conversations.history").param("channel", "C01");

    let first = base.with_cursor(None);
    assert_eq!(first.params, base.params);

    let next = base.with_cursor(Some("abc"));
    assert_eq!(next.params.last(), Some(&("cursor", "abc".to_string())));
    // The base request is reusable for a throttled retry of the same page
    assert_eq!(base.params.len(), 1);
}

#[test]
fn test_retry_after_parsing() {
    let mut headers = HeaderMap::new();
    headers.insert(RETRY_AFTER, HeaderValue::from_static("3"));
    assert_eq!(parse_retry_after(&headers), Some(Duration::from_secs(3)));

    headers.insert(RETRY_AFTER, HeaderValue::from_static("0"));
    assert_eq!(parse_retry_after(&headers), Some(Duration::ZERO));

    // HTTP-date form is not produced by the API; fall back to the default
    headers.insert(
        RETRY_AFTER,
        HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
    );
    assert_eq!(parse_retry_after(&headers), None);
}

#[test]
fn test_ok_payload_classifies_as_data() {
    let outcome = classify_payload(
        StatusCode::OK,
        r#"{"ok": true, "messages": [{"ts": "1.000100"}]}"#,
    );
    match outcome {
        FetchOutcome::Data(envelope) => assert_eq!(envelope.messages.len(), 1),
        other => panic!("Expected Data, got {other:?}"),
    }
}

#[test]
fn test_api_rejection_classifies_as_soft_error() {
    for error in ["channel_not_found", "missing_scope", "invalid_auth"] {
        let body = format!(r#"{{"ok": false, "error": "{error}"}}"#);
        match classify_payload(StatusCode::OK, &body) {
            FetchOutcome::SoftError(reason) => assert_eq!(reason, error),
            other => panic!("Expected SoftError for {error}, got {other:?}"),
        }
    }
}

#[test]
fn test_inband_ratelimit_classifies_as_throttled() {
    let outcome = classify_payload(StatusCode::OK, r#"{"ok": false, "error": "ratelimited"}"#);
    match outcome {
        FetchOutcome::Throttled { wait } => assert_eq!(wait, DEFAULT_RETRY_AFTER),
        other => panic!("Expected Throttled, got {other:?}"),
    }
}

#[test]
fn test_transport_level_failures_classify_as_hard_error() {
    assert!(matches!(
        classify_payload(StatusCode::INTERNAL_SERVER_ERROR, "boom"),
        FetchOutcome::HardError(_)
    ));
    assert!(matches!(
        classify_payload(StatusCode::OK, "<html>not json</html>"),
        FetchOutcome::HardError(_)
    ));
}
