//! Catalog management handlers

use super::ApiError;
use crate::state::{AppState, BookEntry};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Query parameters for listing books
#[derive(Debug, Deserialize)]
pub struct ListBooksQuery {
    /// Page number (1-indexed, 0 treated as 1)
    #[serde(default = "default_page")]
    pub page: u32,

    /// Items per page
    #[serde(default = "default_per_page")]
    pub per_page: u32,

    /// Search query
    pub search: Option<String>,
}

fn default_page() -> u32 {
    1
}
fn default_per_page() -> u32 {
    20
}

/// Book summary for list response
#[derive(Debug, Serialize)]
pub struct BookSummary {
    pub id: String,
    pub isbn: String,
    pub title: Option<String>,
    pub authors: Vec<String>,
}

impl From<&BookEntry> for BookSummary {
    fn from(entry: &BookEntry) -> Self {
        Self {
            id: entry.id.clone(),
            isbn: entry.isbn.clone(),
            title: entry.metadata.title.clone(),
            authors: entry.metadata.authors.clone().unwrap_or_default(),
        }
    }
}

/// List response with pagination
#[derive(Debug, Serialize)]
pub struct ListBooksResponse {
    pub books: Vec<BookSummary>,
    pub total: u32,
    pub page: u32,
    pub per_page: u32,
}

fn matches_search(entry: &BookEntry, search: &str) -> bool {
    let search = search.to_lowercase();
    let metadata = &entry.metadata;

    entry.isbn.contains(&search)
        || metadata
            .title
            .as_deref()
            .is_some_and(|t| t.to_lowercase().contains(&search))
        || metadata
            .authors
            .iter()
            .flatten()
            .any(|a| a.to_lowercase().contains(&search))
}

/// List saved books, sorted by title
pub async fn list_books(
    State(state): State<AppState>,
    Query(query): Query<ListBooksQuery>,
) -> Json<ListBooksResponse> {
    let library = state.library.read().await;

    let mut books: Vec<BookSummary> = library
        .books
        .values()
        .filter(|entry| match &query.search {
            Some(search) => matches_search(entry, search),
            None => true,
        })
        .map(BookSummary::from)
        .collect();

    // Untitled entries sort last, ties broken by ISBN
    books.sort_by(|a, b| {
        (a.title.is_none(), &a.title, &a.isbn).cmp(&(b.title.is_none(), &b.title, &b.isbn))
    });

    let total = books.len() as u32;

    // Paginate (treat page 0 as page 1)
    let page = query.page.max(1);
    let start = (page - 1).saturating_mul(query.per_page) as usize;
    let books: Vec<BookSummary> = books
        .into_iter()
        .skip(start)
        .take(query.per_page as usize)
        .collect();

    Json(ListBooksResponse {
        books,
        total,
        page,
        per_page: query.per_page,
    })
}

/// Body of an add-book request
#[derive(Debug, Deserialize)]
pub struct AddBookRequest {
    pub isbn: String,
}

/// Resolve an ISBN and save it to the catalog
pub async fn add_book(
    State(state): State<AppState>,
    Json(request): Json<AddBookRequest>,
) -> Result<(StatusCode, Json<BookEntry>), ApiError> {
    let isbn = request.isbn.trim().to_string();

    if let Some(existing) = state.library.read().await.find_by_isbn(&isbn) {
        return Err(ApiError::new(
            StatusCode::CONFLICT,
            format!("ISBN {} is already saved as {}", isbn, existing.id),
        ));
    }

    let metadata = state.resolver.fetch(&isbn).await?;
    let entry = BookEntry {
        id: Uuid::new_v4().to_string(),
        isbn: isbn.clone(),
        metadata,
        added_at: chrono::Utc::now(),
    };

    // Disk and memory change together under the write lock
    let mut library = state.library.write().await;
    // Another request may have saved the same ISBN while we were resolving
    if library.find_by_isbn(&isbn).is_some() {
        return Err(ApiError::new(
            StatusCode::CONFLICT,
            format!("ISBN {} is already saved", isbn),
        ));
    }
    library.books.insert(entry.id.clone(), entry.clone());

    if let Err(e) = library.save(&state.library_path()).await {
        library.books.remove(&entry.id);
        return Err(ApiError::internal(e));
    }
    drop(library);

    state.log_sink().log(format!(
        "Saved book - ISBN: {}, title: {}",
        isbn,
        entry.metadata.display_title()
    ));

    Ok((StatusCode::CREATED, Json(entry)))
}

/// Get a saved book
pub async fn get_book(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<BookEntry>, ApiError> {
    Uuid::parse_str(&id).map_err(|_| ApiError::not_found("Invalid book ID"))?;

    let library = state.library.read().await;
    library
        .books
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Book {} not found", id)))
}

/// Delete a saved book
pub async fn delete_book(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    Uuid::parse_str(&id).map_err(|_| ApiError::not_found("Invalid book ID"))?;

    let mut library = state.library.write().await;
    let entry = library
        .books
        .remove(&id)
        .ok_or_else(|| ApiError::not_found(format!("Book {} not found", id)))?;

    // If save fails, restore the entry for consistency
    if let Err(e) = library.save(&state.library_path()).await {
        library.books.insert(id, entry.clone());
        state
            .log_sink()
            .log(format!("Failed to delete book - ISBN: {}", entry.isbn));
        return Err(ApiError::internal(e));
    }
    drop(library);

    state.log_sink().log(format!(
        "Deleted book - ISBN: {}, title: {}",
        entry.isbn,
        entry.metadata.display_title()
    ));

    Ok(StatusCode::NO_CONTENT)
}
