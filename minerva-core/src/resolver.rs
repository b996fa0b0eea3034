//! ISBN metadata resolver with a single-flight response cache
//!
//! [`Resolver::fetch`] answers from the cache when it can. On a miss it either
//! joins a request already in flight for the same ISBN or starts one. The
//! request future is never spawned: it only makes progress while at least one
//! caller awaits it, so a lookup abandoned by every caller is dropped before
//! it can write to the cache.

use crate::config::{is_unreserved, ResolverConfig};
use crate::error::{ConfigError, LookupError};
use crate::log_sink::LogSink;
use crate::transport::{HttpTransport, ReqwestTransport};
use crate::types::{BookMetadata, VolumeQueryResult};
use futures::future::{BoxFuture, FutureExt, Shared, WeakShared};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use url::Url;

type LookupResult<T = BookMetadata> = std::result::Result<T, LookupError>;
type LookupFuture = BoxFuture<'static, LookupResult>;

/// A request for one ISBN that callers can join
struct InFlight {
    id: u64,
    future: WeakShared<LookupFuture>,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, BookMetadata>,
    in_flight: HashMap<String, InFlight>,
    next_flight_id: u64,
}

struct Inner {
    config: ResolverConfig,
    transport: Arc<dyn HttpTransport>,
    log: LogSink,
    state: Mutex<CacheState>,
}

/// Resolves ISBNs to [`BookMetadata`] through the books API
///
/// Cloning yields another handle to the same cache.
#[derive(Clone)]
pub struct Resolver {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl Resolver {
    /// Create a resolver over an arbitrary transport
    pub fn new(config: ResolverConfig, transport: Arc<dyn HttpTransport>, log: LogSink) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                transport,
                log,
                state: Mutex::new(CacheState::default()),
            }),
        }
    }

    /// Create a resolver talking to the network through reqwest
    pub fn from_config(config: ResolverConfig, log: LogSink) -> Result<Self, ConfigError> {
        config.validate()?;
        let transport = ReqwestTransport::new(config.request_timeout)?;
        Ok(Self::new(config, Arc::new(transport), log))
    }

    /// Get metadata for `isbn`, from the cache or the books API
    pub async fn fetch(&self, isbn: &str) -> LookupResult {
        let flight = {
            let mut state = self.inner.state.lock().await;

            if let Some(book) = state.entries.get(isbn) {
                self.inner
                    .log
                    .log(format!("Using cached book info - ISBN: {}", isbn));
                return Ok(book.clone());
            }

            let joined = state
                .in_flight
                .get(isbn)
                .and_then(|flight| flight.future.upgrade());

            match joined {
                Some(future) => {
                    self.inner
                        .log
                        .log(format!("Joining in-flight request - ISBN: {}", isbn));
                    future
                }
                None => {
                    let url = self.inner.request_url(isbn)?;
                    let id = state.next_flight_id;
                    state.next_flight_id += 1;

                    let future: Shared<LookupFuture> = Arc::clone(&self.inner)
                        .lookup(isbn.to_string(), url, id)
                        .boxed()
                        .shared();
                    if let Some(weak) = future.downgrade() {
                        state
                            .in_flight
                            .insert(isbn.to_string(), InFlight { id, future: weak });
                    }
                    future
                }
            }
        };

        flight.await
    }

    /// Peek at the cache without logging or touching the network
    pub async fn cached(&self, isbn: &str) -> Option<BookMetadata> {
        self.inner.state.lock().await.entries.get(isbn).cloned()
    }

    /// Number of cached entries
    pub async fn cache_len(&self) -> usize {
        self.inner.state.lock().await.entries.len()
    }

    /// The diagnostic channel this resolver logs to
    pub fn log_sink(&self) -> &LogSink {
        &self.inner.log
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.inner.config
    }
}

impl Inner {
    /// Build `<api_url>/volumes?q=isbn:<isbn>[&key=<key>]`
    fn request_url(&self, isbn: &str) -> LookupResult<Url> {
        build_request_url(&self.config, isbn).ok_or_else(|| {
            self.log
                .log(format!("Unable to build request - ISBN: {:?}", isbn));
            LookupError::MalformedRequest {
                isbn: isbn.to_string(),
            }
        })
    }

    /// Run one request and settle the cache with its outcome
    async fn lookup(self: Arc<Self>, isbn: String, url: Url, flight_id: u64) -> LookupResult {
        let outcome = self.request(&isbn, &url).await;

        let mut state = self.state.lock().await;
        if state
            .in_flight
            .get(&isbn)
            .is_some_and(|flight| flight.id == flight_id)
        {
            state.in_flight.remove(&isbn);
        }
        if let Ok(book) = &outcome {
            state.entries.insert(isbn, book.clone());
        }

        outcome
    }

    async fn request(&self, isbn: &str, url: &Url) -> LookupResult {
        self.log
            .log(format!("Calling books API - ISBN: {}", isbn));

        let response =
            match tokio::time::timeout(self.config.request_timeout, self.transport.get(url)).await
            {
                Ok(Ok(response)) => response,
                Ok(Err(e)) => return Err(self.failure(isbn, "Books API request failed", e)),
                Err(_) => {
                    let reason = format!("timed out after {:?}", self.config.request_timeout);
                    return Err(self.failure(isbn, "Books API request failed", reason));
                }
            };

        if !response.is_success() {
            let reason = format!("HTTP status {}", response.status);
            return Err(self.failure(isbn, "Books API request failed", reason));
        }
        if response.body.is_empty() {
            return Err(self.failure(isbn, "Books API request failed", "empty response body"));
        }

        self.log.log(format!(
            "Books API returned {} bytes - ISBN: {}",
            response.body.len(),
            isbn
        ));

        let result = VolumeQueryResult::from_slice(&response.body)
            .map_err(|e| self.failure(isbn, "Unable to decode books API response", e))?;
        let mut book = result
            .into_first()
            .ok_or_else(|| self.failure(isbn, "No books found", "response contained no items"))?;
        book.isbn = isbn.to_string();

        self.log.log(format!(
            "Resolved book info - ISBN: {}, title: {}",
            isbn,
            book.display_title()
        ));
        Ok(book)
    }

    fn failure(&self, isbn: &str, what: &str, reason: impl ToString) -> LookupError {
        let reason = reason.to_string();
        self.log
            .log(format!("{} - ISBN: {}, error: {}", what, isbn, reason));
        LookupError::TransportOrDecodeFailure {
            isbn: isbn.to_string(),
            reason,
        }
    }
}

/// Request target for `isbn`, or `None` if the identifier or base endpoint
/// cannot form one
///
/// The identifier goes into the query verbatim, so it must consist of URL
/// unreserved characters only; anything else would need escaping or would
/// change the meaning of the query.
pub fn build_request_url(config: &ResolverConfig, isbn: &str) -> Option<Url> {
    if isbn.is_empty() || !isbn.chars().all(is_unreserved) {
        return None;
    }

    let mut url = Url::parse(&format!("{}/volumes", config.api_url.trim_end_matches('/'))).ok()?;
    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return None;
    }

    let query = match &config.api_key {
        Some(key) if key.chars().all(is_unreserved) => format!("q=isbn:{}&key={}", isbn, key),
        Some(_) => return None,
        None => format!("q=isbn:{}", isbn),
    };
    url.set_query(Some(&query));
    Some(url)
}
