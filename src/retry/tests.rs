//! Tests for the retry module

use super::*;
use crate::backoff::{Backoff, InfiniteBackoff, LimitedTriesBackoff, NoopBackoff};
use crate::context::{Context, ContextError};
use crate::error::Error;
use crate::transport::Transport;
use reqwest::{Client, Method};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn get(url: &str) -> reqwest::Request {
    reqwest::Request::new(Method::GET, url.parse().unwrap())
}

async fn flaky_server(failures: u64) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(failures)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;
    server
}

fn retry_503() -> RetryOnStatus {
    RetryOnStatus::new([StatusCode::SERVICE_UNAVAILABLE])
}

fn quick(retries: u32) -> Box<dyn Backoff> {
    Box::new(LimitedTriesBackoff::new(Duration::from_millis(5), retries))
}

#[test]
fn test_default_statuses() {
    let policy = RetryOnStatus::default();
    assert_eq!(policy.statuses().len(), 5);
    assert!(policy.statuses().contains(&StatusCode::TOO_MANY_REQUESTS));
    assert!(!policy.statuses().contains(&StatusCode::NOT_FOUND));
}

#[tokio::test]
async fn test_retries_until_success() {
    let server = flaky_server(4).await;
    let client = Client::new();
    let policy = retry_503();

    let response = RetryExecutor::new(&client, Some(&policy), quick(5))
        .execute(&Context::background(), get(&format!("{}/flaky", server.uri())))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(server.received_requests().await.unwrap().len(), 5);
}

#[tokio::test]
async fn test_exhaustion_reports_attempts() {
    let server = flaky_server(10).await;
    let client = Client::new();
    let policy = retry_503();

    let err = RetryExecutor::new(&client, Some(&policy), quick(2))
        .execute(&Context::background(), get(&format!("{}/flaky", server.uri())))
        .await
        .unwrap_err();

    match err {
        Error::RetryExhausted {
            attempts,
            last_status,
        } => {
            assert_eq!(attempts, 3);
            assert_eq!(last_status, Some(StatusCode::SERVICE_UNAVAILABLE));
        }
        other => panic!("expected RetryExhausted, got {other:?}"),
    }
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_noop_backoff_exhausts_after_first_attempt() {
    let server = flaky_server(1).await;
    let client = Client::new();
    let policy = retry_503();

    let err = RetryExecutor::new(&client, Some(&policy), Box::new(NoopBackoff::new()))
        .execute(&Context::background(), get(&format!("{}/flaky", server.uri())))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::RetryExhausted { attempts: 1, .. }));
}

#[tokio::test]
async fn test_without_policy_executes_once() {
    let server = flaky_server(1).await;
    let client = Client::new();

    let response = RetryExecutor::new(&client, None, quick(5))
        .execute(&Context::background(), get(&format!("{}/flaky", server.uri())))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_policy_decline_returns_response_as_is() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let client = Client::new();
    let policy = retry_503();

    let response = RetryExecutor::new(&client, Some(&policy), quick(5))
        .execute(&Context::background(), get(&server.uri()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_cancelled_while_waiting() {
    let server = flaky_server(10).await;
    let client = Client::new();
    let policy = retry_503();
    let ctx = Context::background().with_timeout(Duration::from_millis(200));

    let started = tokio::time::Instant::now();
    let err = RetryExecutor::new(
        &client,
        Some(&policy),
        Box::new(InfiniteBackoff::new(Duration::from_secs(10))),
    )
    .execute(&ctx, get(&format!("{}/flaky", server.uri())))
    .await
    .unwrap_err();

    assert!(started.elapsed() < Duration::from_secs(5));
    match err {
        Error::RetryCancelled { attempts, source } => {
            assert_eq!(attempts, 1);
            assert_eq!(source, ContextError::DeadlineExceeded);
        }
        other => panic!("expected RetryCancelled, got {other:?}"),
    }
}

#[tokio::test]
async fn test_cancel_handle_stops_retrying() {
    let server = flaky_server(10).await;
    let client = Client::new();
    let policy = retry_503();
    let (ctx, handle) = Context::background().with_cancel();

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.cancel();
    });

    let err = RetryExecutor::new(
        &client,
        Some(&policy),
        Box::new(InfiniteBackoff::new(Duration::from_secs(10))),
    )
    .execute(&ctx, get(&format!("{}/flaky", server.uri())))
    .await
    .unwrap_err();
    canceller.await.unwrap();

    assert!(err.is_cancellation());
    assert!(matches!(
        err,
        Error::RetryCancelled {
            source: ContextError::Cancelled,
            ..
        }
    ));
}

#[tokio::test]
async fn test_slow_response_is_cancelled_mid_execution() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;
    let client = Client::new();
    let ctx = Context::background().with_timeout(Duration::from_millis(100));

    let err = RetryExecutor::new(&client, None, quick(1))
        .execute(&ctx, get(&server.uri()))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Cancelled {
            attempts: 1,
            source: ContextError::DeadlineExceeded
        }
    ));
    assert!(!err.was_sent());
}

#[tokio::test]
async fn test_cancelled_during_later_attempt_counts_as_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;
    let client = Client::new();
    let policy = retry_503();
    let ctx = Context::background().with_timeout(Duration::from_millis(300));

    let err = RetryExecutor::new(&client, Some(&policy), quick(5))
        .execute(&ctx, get(&server.uri()))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Cancelled {
            attempts: 3,
            source: ContextError::DeadlineExceeded
        }
    ));
    assert!(err.was_sent());
    assert!(err.is_cancellation());
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_transport_errors_follow_policy() {
    let client = Client::new();
    let refused = "http://127.0.0.1:1/";

    let strict = retry_503();
    let err = RetryExecutor::new(&client, Some(&strict), quick(3))
        .execute(&Context::background(), get(refused))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Http(_)));

    let lenient = retry_503().with_transport_errors(true);
    let err = RetryExecutor::new(&client, Some(&lenient), quick(3))
        .execute(&Context::background(), get(refused))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::RetryExhausted {
            attempts: 4,
            last_status: None
        }
    ));
}

#[tokio::test]
async fn test_closure_policy_and_custom_transport() {
    struct Counting {
        inner: Client,
        calls: std::sync::atomic::AtomicU32,
    }

    #[async_trait::async_trait]
    impl Transport for Counting {
        async fn execute(
            &self,
            request: reqwest::Request,
        ) -> std::result::Result<reqwest::Response, reqwest::Error> {
            self.calls
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            self.inner.execute(request).await
        }
    }

    let server = flaky_server(2).await;
    let transport = Counting {
        inner: Client::new(),
        calls: Default::default(),
    };
    let policy = |outcome: &Outcome| {
        outcome
            .as_ref()
            .map(|r| r.status().is_server_error())
            .unwrap_or(false)
    };

    let response = RetryExecutor::new(&transport, Some(&policy), quick(5))
        .execute(&Context::background(), get(&format!("{}/flaky", server.uri())))
        .await
        .unwrap();

    assert!(response.status().is_success());
    assert_eq!(transport.calls.load(std::sync::atomic::Ordering::SeqCst), 3);
}
