//! Integration tests for the metadata resolver

use futures::future::join_all;
use futures::StreamExt;
use minerva_core::{
    BookMetadata, LogSink, LookupError, MockTransport, Resolver, ResolverConfig,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const CLEAN_CODE: &str = "9780132350884";

/// Create a resolver over the given mock, keeping a handle to the mock
fn resolver_with(transport: MockTransport) -> (Resolver, Arc<MockTransport>) {
    resolver_with_config(transport, ResolverConfig::default())
}

fn resolver_with_config(
    transport: MockTransport,
    config: ResolverConfig,
) -> (Resolver, Arc<MockTransport>) {
    let transport = Arc::new(transport);
    let resolver = Resolver::new(config, transport.clone(), LogSink::default());
    (resolver, transport)
}

fn clean_code_transport() -> MockTransport {
    MockTransport::new().with_volume(CLEAN_CODE, json!({ "title": "Clean Code", "pageCount": 464 }))
}

fn assert_transport_failure(result: Result<BookMetadata, LookupError>) -> String {
    match result {
        Err(LookupError::TransportOrDecodeFailure { reason, .. }) => reason,
        other => panic!("expected TransportOrDecodeFailure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_clean_code_example() {
    let (resolver, transport) = resolver_with(clean_code_transport());

    let first = resolver.fetch(CLEAN_CODE).await.unwrap();
    assert_eq!(first.title.as_deref(), Some("Clean Code"));
    assert_eq!(first.page_count, 464);
    assert_eq!(first.isbn, CLEAN_CODE);
    assert!(first.subtitle.is_none());
    assert!(first.authors.is_none());
    assert!(first.categories.is_none());
    assert!(first.language.is_none());
    assert!(first.description.is_none());
    assert!(first.published_date.is_none());
    assert_eq!(transport.calls(), 1);

    let second = resolver.fetch(CLEAN_CODE).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn test_request_target() {
    let config = ResolverConfig::default()
        .with_api_url("http://books.test/v1")
        .with_api_key("test-key");
    let (resolver, transport) = resolver_with_config(clean_code_transport(), config);

    resolver.fetch(CLEAN_CODE).await.unwrap();

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].as_str(),
        "http://books.test/v1/volumes?q=isbn:9780132350884&key=test-key"
    );
}

#[tokio::test]
async fn test_all_fields_are_decoded() {
    let item = json!({
        "title": "Clean Code",
        "subtitle": "A Handbook of Agile Software Craftsmanship",
        "authors": ["Robert C. Martin"],
        "categories": ["Computers"],
        "language": "en",
        "description": "Even bad code can function.",
        "publishedDate": "2008-08-01",
        "pageCount": 464
    });
    let (resolver, _) = resolver_with(MockTransport::new().with_volume(CLEAN_CODE, item));

    let book = resolver.fetch(CLEAN_CODE).await.unwrap();
    assert_eq!(
        book.subtitle.as_deref(),
        Some("A Handbook of Agile Software Craftsmanship")
    );
    assert_eq!(book.authors, Some(vec!["Robert C. Martin".to_string()]));
    assert_eq!(book.categories, Some(vec!["Computers".to_string()]));
    assert_eq!(book.language.as_deref(), Some("en"));
    assert_eq!(book.description.as_deref(), Some("Even bad code can function."));
    assert_eq!(book.published_date.as_deref(), Some("2008-08-01"));
    assert_eq!(book.page_count, 464);
}

#[tokio::test]
async fn test_google_books_nested_shape() {
    let body = json!({
        "kind": "books#volumes",
        "totalItems": 1,
        "items": [{
            "kind": "books#volume",
            "volumeInfo": { "title": "Clean Code", "authors": ["Robert C. Martin"], "pageCount": 464 }
        }]
    });
    let transport = MockTransport::new().with_response(CLEAN_CODE, 200, body.to_string());
    let (resolver, _) = resolver_with(transport);

    let book = resolver.fetch(CLEAN_CODE).await.unwrap();
    assert_eq!(book.title.as_deref(), Some("Clean Code"));
    assert_eq!(book.primary_author(), Some("Robert C. Martin"));
}

#[tokio::test]
async fn test_isbn_comes_from_query() {
    let transport = MockTransport::new()
        .with_volume(CLEAN_CODE, json!({ "title": "Clean Code", "isbn": "something-else" }));
    let (resolver, _) = resolver_with(transport);

    let book = resolver.fetch(CLEAN_CODE).await.unwrap();
    assert_eq!(book.isbn, CLEAN_CODE);
}

#[tokio::test]
async fn test_malformed_identifier_makes_no_request() {
    let (resolver, transport) = resolver_with(clean_code_transport());

    let err = resolver.fetch("978 0132350884").await.unwrap_err();
    assert_eq!(
        err,
        LookupError::MalformedRequest {
            isbn: "978 0132350884".to_string()
        }
    );
    assert!(!err.is_retryable());
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn test_malformed_base_endpoint_makes_no_request() {
    let config = ResolverConfig::default().with_api_url("::not a url::");
    let (resolver, transport) = resolver_with_config(clean_code_transport(), config);

    let err = resolver.fetch(CLEAN_CODE).await.unwrap_err();
    assert!(matches!(err, LookupError::MalformedRequest { .. }));
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn test_error_status_is_not_cached() {
    let transport = MockTransport::new().with_response(CLEAN_CODE, 503, "Service Unavailable");
    let (resolver, transport) = resolver_with(transport);

    let reason = assert_transport_failure(resolver.fetch(CLEAN_CODE).await);
    assert!(reason.contains("503"));
    assert_eq!(resolver.cache_len().await, 0);

    // Failures are retried on the next call
    assert_transport_failure(resolver.fetch(CLEAN_CODE).await);
    assert_eq!(transport.calls(), 2);
}

#[tokio::test]
async fn test_connection_error() {
    let transport = MockTransport::new().with_error(CLEAN_CODE, "connection refused");
    let (resolver, _) = resolver_with(transport);

    let result = resolver.fetch(CLEAN_CODE).await;
    let err = result.clone().unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(err.isbn(), CLEAN_CODE);
    assert!(assert_transport_failure(result).contains("connection refused"));
    assert!(resolver.cached(CLEAN_CODE).await.is_none());
}

#[tokio::test]
async fn test_empty_items_is_a_failure() {
    let transport = MockTransport::new().with_response(CLEAN_CODE, 200, r#"{"items":[]}"#);
    let (resolver, _) = resolver_with(transport);

    assert_transport_failure(resolver.fetch(CLEAN_CODE).await);
    assert_eq!(resolver.cache_len().await, 0);
}

#[tokio::test]
async fn test_unknown_isbn_is_a_failure() {
    let (resolver, _) = resolver_with(MockTransport::new());
    assert_transport_failure(resolver.fetch("0000000000").await);
}

#[tokio::test]
async fn test_undecodable_body_is_a_failure() {
    let transport = MockTransport::new()
        .with_response(CLEAN_CODE, 200, "<html>rate limited</html>")
        .with_response("0132350882", 200, "");
    let (resolver, _) = resolver_with(transport);

    assert_transport_failure(resolver.fetch(CLEAN_CODE).await);
    assert_transport_failure(resolver.fetch("0132350882").await);
    assert_eq!(resolver.cache_len().await, 0);
}

#[tokio::test]
async fn test_mistyped_volume_info_is_a_failure() {
    let transport = MockTransport::new().with_volume(
        "111",
        json!({ "volumeInfo": { "title": 5, "pageCount": "x" } }),
    );
    let (resolver, transport) = resolver_with(transport);

    let reason = assert_transport_failure(resolver.fetch("111").await);
    assert!(reason.contains("invalid type"), "{reason}");
    assert_eq!(resolver.cache_len().await, 0);

    // Not cached, so the next call goes back to the network
    assert_transport_failure(resolver.fetch("111").await);
    assert_eq!(transport.calls_for("111"), 2);
}

#[tokio::test]
async fn test_item_without_book_fields_is_a_failure() {
    let transport = MockTransport::new()
        .with_volume("222", json!({ "kind": "books#volume", "id": "abc" }));
    let (resolver, _) = resolver_with(transport);

    let reason = assert_transport_failure(resolver.fetch("222").await);
    assert!(reason.contains("no book fields"), "{reason}");
    assert_eq!(resolver.cache_len().await, 0);
}

#[tokio::test]
async fn test_non_object_item_among_valid_items_is_a_failure() {
    let body = json!({ "items": [{ "title": "Clean Code" }, 42] }).to_string();
    let transport = MockTransport::new().with_response(CLEAN_CODE, 200, body);
    let (resolver, _) = resolver_with(transport);

    assert_transport_failure(resolver.fetch(CLEAN_CODE).await);
    assert_eq!(resolver.cache_len().await, 0);
}

#[tokio::test]
async fn test_failure_leaves_other_entries_alone() {
    let transport = clean_code_transport().with_response("0132350882", 500, "boom");
    let (resolver, _) = resolver_with(transport);

    let cached = resolver.fetch(CLEAN_CODE).await.unwrap();
    assert_transport_failure(resolver.fetch("0132350882").await);

    assert_eq!(resolver.cache_len().await, 1);
    assert_eq!(resolver.cached(CLEAN_CODE).await, Some(cached));
}

#[tokio::test]
async fn test_concurrent_fetches_share_one_request() {
    let transport = clean_code_transport().with_delay(Duration::from_millis(50));
    let (resolver, transport) = resolver_with(transport);

    let results = join_all((0..10).map(|_| resolver.fetch(CLEAN_CODE))).await;

    assert_eq!(transport.calls(), 1);
    let first = results[0].clone().unwrap();
    for result in results {
        assert_eq!(result.unwrap(), first);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_fetches_across_tasks() {
    let transport = clean_code_transport().with_delay(Duration::from_millis(100));
    let (resolver, transport) = resolver_with(transport);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let resolver = resolver.clone();
            tokio::spawn(async move { resolver.fetch(CLEAN_CODE).await })
        })
        .collect();

    for handle in handles {
        let book = handle.await.unwrap().unwrap();
        assert_eq!(book.title.as_deref(), Some("Clean Code"));
    }
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn test_concurrent_failures_share_one_outcome() {
    let transport = MockTransport::new()
        .with_error(CLEAN_CODE, "connection reset")
        .with_delay(Duration::from_millis(50));
    let (resolver, transport) = resolver_with(transport);

    let results = join_all((0..5).map(|_| resolver.fetch(CLEAN_CODE))).await;

    assert_eq!(transport.calls(), 1);
    let first = results[0].clone().unwrap_err();
    for result in results {
        assert_eq!(result.unwrap_err(), first);
    }
}

#[tokio::test]
async fn test_distinct_isbns_are_fetched_independently() {
    let transport = clean_code_transport()
        .with_volume("0132350882", json!({ "title": "Clean Code (10-digit)" }))
        .with_delay(Duration::from_millis(20));
    let (resolver, transport) = resolver_with(transport);

    let (a, b) = tokio::join!(resolver.fetch(CLEAN_CODE), resolver.fetch("0132350882"));

    assert_eq!(a.unwrap().title.as_deref(), Some("Clean Code"));
    assert_eq!(b.unwrap().title.as_deref(), Some("Clean Code (10-digit)"));
    assert_eq!(transport.calls(), 2);
    assert_eq!(transport.calls_for(CLEAN_CODE), 1);
}

#[tokio::test]
async fn test_timeout_is_a_failure() {
    let transport = clean_code_transport().with_delay(Duration::from_millis(500));
    let config = ResolverConfig::default().with_request_timeout(Duration::from_millis(50));
    let (resolver, _) = resolver_with_config(transport, config);

    let reason = assert_transport_failure(resolver.fetch(CLEAN_CODE).await);
    assert!(reason.contains("timed out"));
    assert!(resolver.cached(CLEAN_CODE).await.is_none());
}

#[tokio::test]
async fn test_abandoned_fetch_does_not_populate_cache() {
    let transport = clean_code_transport().with_delay(Duration::from_millis(200));
    let (resolver, transport) = resolver_with(transport);

    let abandoned = tokio::time::timeout(Duration::from_millis(20), resolver.fetch(CLEAN_CODE)).await;
    assert!(abandoned.is_err());
    assert_eq!(transport.calls(), 1);

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(resolver.cached(CLEAN_CODE).await.is_none());

    // A new caller starts a fresh request instead of joining the dead one
    let book = resolver.fetch(CLEAN_CODE).await.unwrap();
    assert_eq!(book.title.as_deref(), Some("Clean Code"));
    assert_eq!(transport.calls(), 2);
}

#[tokio::test]
async fn test_log_messages_follow_fetch_steps() {
    let (resolver, _) = resolver_with(clean_code_transport());
    let mut messages = Box::pin(resolver.log_sink().subscribe());

    resolver.fetch(CLEAN_CODE).await.unwrap();

    let start = messages.next().await.unwrap().message;
    let received = messages.next().await.unwrap().message;
    let resolved = messages.next().await.unwrap().message;
    assert_eq!(start, format!("Calling books API - ISBN: {}", CLEAN_CODE));
    assert!(received.starts_with("Books API returned"));
    assert!(resolved.starts_with("Resolved book info"));
    assert!(resolved.contains("Clean Code"));

    resolver.fetch(CLEAN_CODE).await.unwrap();
    let hit = messages.next().await.unwrap().message;
    assert_eq!(hit, format!("Using cached book info - ISBN: {}", CLEAN_CODE));
}

#[tokio::test]
async fn test_failures_are_logged_with_isbn() {
    let transport = MockTransport::new().with_response(CLEAN_CODE, 404, "");
    let (resolver, _) = resolver_with(transport);
    let mut messages = Box::pin(resolver.log_sink().subscribe());

    assert_transport_failure(resolver.fetch(CLEAN_CODE).await);
    let _ = resolver.fetch("bad isbn").await;

    let start = messages.next().await.unwrap().message;
    let failed = messages.next().await.unwrap().message;
    let malformed = messages.next().await.unwrap().message;
    assert!(start.starts_with("Calling books API"));
    assert!(failed.starts_with("Books API request failed"));
    assert!(failed.contains(CLEAN_CODE));
    assert!(malformed.contains("bad isbn"));
}
