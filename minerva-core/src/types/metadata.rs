//! Book metadata as returned by the books API

use serde::{Deserialize, Serialize};

/// One catalog entry resolved from the remote books service
///
/// Field names follow the service's camelCase JSON so that a decoded value
/// serializes back to the same keys it was read from.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BookMetadata {
    /// Book title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Book subtitle
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,

    /// Author names
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authors: Option<Vec<String>>,

    /// Category/genre names
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,

    /// Language code (ISO 639-1)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    /// Book description/summary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Publication date as reported by the service (`2008`, `2008-08-01`, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,

    /// Number of pages, 0 when the service does not report it
    #[serde(default)]
    pub page_count: u32,

    /// The identifier this entry was resolved for
    #[serde(default)]
    pub isbn: String,
}

impl BookMetadata {
    /// Create metadata for an identifier with every optional field absent
    pub fn new(isbn: impl Into<String>) -> Self {
        Self {
            isbn: isbn.into(),
            ..Self::default()
        }
    }

    /// Set title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Add an author
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.authors.get_or_insert_with(Vec::new).push(author.into());
        self
    }

    /// Set page count
    pub fn with_page_count(mut self, page_count: u32) -> Self {
        self.page_count = page_count;
        self
    }

    /// Get the primary author (first listed)
    pub fn primary_author(&self) -> Option<&str> {
        self.authors
            .as_ref()
            .and_then(|authors| authors.first())
            .map(|s| s.as_str())
    }

    /// Title for display, falling back to the identifier
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.isbn)
    }
}
