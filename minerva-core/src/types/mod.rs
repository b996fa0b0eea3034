//! Core types exchanged with the books API

mod metadata;
mod volume;

pub use metadata::BookMetadata;
pub use volume::{VolumeItem, VolumeQueryResult};
