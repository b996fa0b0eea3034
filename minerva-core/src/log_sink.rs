//! Diagnostic message channel
//!
//! A publish/subscribe stream of human-readable messages describing what the
//! resolver is doing. Collaborators (the SSE endpoint, the CLI's verbose mode)
//! subscribe to it; producers only ever call [`LogSink::log`].

use chrono::{DateTime, Utc};
use futures::stream::Stream;
use serde::Serialize;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

/// Name of the channel, used as the SSE event name
pub const LOG_TOPIC: &str = "LogMessage";

/// Default number of messages buffered per subscriber
pub const DEFAULT_LOG_CAPACITY: usize = 256;

/// A single diagnostic message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogMessage {
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl LogMessage {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

impl std::fmt::Display for LogMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.timestamp.to_rfc3339(), self.message)
    }
}

/// Broadcast channel for [`LogMessage`]s
///
/// Cloning yields another handle to the same channel.
#[derive(Debug, Clone)]
pub struct LogSink {
    tx: broadcast::Sender<LogMessage>,
}

impl Default for LogSink {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}

impl LogSink {
    /// Create a sink buffering up to `capacity` messages per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish a message
    ///
    /// Never blocks and never fails: with no subscribers attached the message
    /// is simply dropped. The message is mirrored to `tracing` as well.
    pub fn log(&self, message: impl Into<String>) {
        let message = LogMessage::new(message);
        tracing::debug!(target: "minerva_core::log_sink", "{}", message.message);

        // Ignore errors (no subscribers)
        let _ = self.tx.send(message);
    }

    /// Stream of every message logged after this call, in emission order
    ///
    /// A subscriber that falls more than the channel capacity behind skips the
    /// messages it missed and continues with the oldest still buffered.
    pub fn subscribe(&self) -> impl Stream<Item = LogMessage> + Send + 'static {
        BroadcastStream::new(self.tx.subscribe()).filter_map(|result| match result {
            Ok(message) => Some(message),
            // Lagged, skip
            Err(e) => {
                tracing::warn!("Log subscriber fell behind: {}", e);
                None
            }
        })
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
