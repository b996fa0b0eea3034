//! Minerva Core Library
//!
//! This crate resolves ISBNs to book metadata through the Google Books API.
//! Lookups go through a [`Resolver`] that caches every successful answer for
//! the life of the process and collapses concurrent lookups of the same ISBN
//! into a single request. Progress is reported on a [`LogSink`].

pub mod config;
pub mod error;
pub mod log_sink;
pub mod resolver;
pub mod transport;
pub mod types;

pub use config::ResolverConfig;
pub use error::{ConfigError, LookupError, TransportError};
pub use log_sink::{LogMessage, LogSink, LOG_TOPIC};
pub use resolver::Resolver;
pub use transport::{HttpTransport, MockTransport, ReqwestTransport, TransportResponse};
pub use types::BookMetadata;
