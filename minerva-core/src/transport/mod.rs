//! HTTP transport abstraction
//!
//! The resolver only ever issues `GET` requests and inspects status and body,
//! so the seam is a single async method. [`ReqwestTransport`] talks to the
//! network; [`MockTransport`] serves canned replies for tests.

mod http;
mod mock;

pub use self::http::ReqwestTransport;
pub use self::mock::MockTransport;

use crate::error::TransportError;
use async_trait::async_trait;
use url::Url;

/// Result type for transport operations
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Status and body of a completed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Whether the status is 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Abstract HTTP client
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Issue a `GET` request for the given URL
    ///
    /// Non-2xx statuses are returned as responses, not errors. Errors are
    /// reserved for requests that produced no response at all.
    async fn get(&self, url: &Url) -> TransportResult<TransportResponse>;
}
