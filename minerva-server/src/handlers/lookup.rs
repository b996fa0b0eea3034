//! ISBN lookup handler

use super::ApiError;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::Json;
use minerva_core::BookMetadata;

/// Resolve an ISBN without saving it
pub async fn lookup_book(
    State(state): State<AppState>,
    Path(isbn): Path<String>,
) -> Result<Json<BookMetadata>, ApiError> {
    let book = state.resolver.fetch(&isbn).await?;
    Ok(Json(book))
}
