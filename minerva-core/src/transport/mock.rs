//! In-memory transport (for testing)

use super::{HttpTransport, TransportResponse, TransportResult};
use crate::error::TransportError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone)]
enum MockReply {
    Response(TransportResponse),
    Error(String),
}

/// Transport serving canned replies keyed by the ISBN in the `q` parameter
///
/// Unknown ISBNs get a `200` with no `items`, which is what the books API
/// answers for a query that matched nothing.
#[derive(Debug)]
pub struct MockTransport {
    replies: HashMap<String, MockReply>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    requests: Mutex<Vec<Url>>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            replies: HashMap::new(),
            delay: None,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answer `isbn` with a single-item volumes envelope around `item`
    pub fn with_volume(self, isbn: impl Into<String>, item: serde_json::Value) -> Self {
        let body = serde_json::json!({ "items": [item] }).to_string();
        self.with_response(isbn, 200, body)
    }

    /// Answer `isbn` with an arbitrary status and body
    pub fn with_response(
        mut self,
        isbn: impl Into<String>,
        status: u16,
        body: impl Into<Vec<u8>>,
    ) -> Self {
        self.replies.insert(
            isbn.into(),
            MockReply::Response(TransportResponse::new(status, body)),
        );
        self
    }

    /// Fail requests for `isbn` as if the connection broke
    pub fn with_error(mut self, isbn: impl Into<String>, message: impl Into<String>) -> Self {
        self.replies
            .insert(isbn.into(), MockReply::Error(message.into()));
        self
    }

    /// Hold every reply back for `delay`
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Total number of requests received
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of requests received for one ISBN
    pub fn calls_for(&self, isbn: &str) -> usize {
        self.requests()
            .iter()
            .filter(|url| queried_isbn(url).as_deref() == Some(isbn))
            .count()
    }

    /// Every URL requested so far, in arrival order
    pub fn requests(&self) -> Vec<Url> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Extract the identifier from a `q=isbn:<identifier>` query
fn queried_isbn(url: &Url) -> Option<String> {
    url.query_pairs()
        .find(|(name, _)| name == "q")
        .and_then(|(_, value)| value.strip_prefix("isbn:").map(str::to_string))
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn get(&self, url: &Url) -> TransportResult<TransportResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let reply = queried_isbn(url).and_then(|isbn| self.replies.get(&isbn).cloned());
        match reply {
            Some(MockReply::Response(response)) => Ok(response),
            Some(MockReply::Error(message)) => Err(TransportError::Request(message)),
            None => Ok(TransportResponse::new(200, r#"{"kind":"books#volumes","totalItems":0}"#)),
        }
    }
}
