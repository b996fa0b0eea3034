//! Response envelope of the books API `volumes` endpoint

use super::BookMetadata;
use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::{Map, Value};

/// Keys of [`BookMetadata`] the service can populate
const BOOK_FIELDS: &[&str] = &[
    "title",
    "subtitle",
    "authors",
    "categories",
    "language",
    "description",
    "publishedDate",
    "pageCount",
];

/// `{"items": [...]}` envelope returned by a volumes query
///
/// `items` is omitted entirely by the service when nothing matched, so a
/// missing field decodes to an empty list.
#[derive(Debug, Deserialize)]
pub struct VolumeQueryResult {
    #[serde(default)]
    pub items: Vec<VolumeItem>,
}

/// A single result entry
///
/// The service nests the interesting fields under `volumeInfo`; a flat
/// object carrying the same fields is accepted too. The shape is chosen by
/// the presence of `volumeInfo` and then decoded strictly, so a mistyped
/// field is an error rather than an empty entry.
#[derive(Debug)]
pub enum VolumeItem {
    Nested { volume_info: BookMetadata },
    Flat(BookMetadata),
}

impl<'de> Deserialize<'de> for VolumeItem {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut item = Map::<String, Value>::deserialize(deserializer)?;

        let (nested, fields) = match item.remove("volumeInfo") {
            Some(Value::Object(info)) => (true, info),
            Some(other) => {
                return Err(de::Error::custom(format!(
                    "volumeInfo must be an object, got {}",
                    other
                )))
            }
            None => (false, item),
        };

        if !BOOK_FIELDS.iter().any(|key| fields.contains_key(*key)) {
            return Err(de::Error::custom("volume item carries no book fields"));
        }

        let metadata = BookMetadata::deserialize(Value::Object(fields)).map_err(de::Error::custom)?;
        Ok(if nested {
            Self::Nested {
                volume_info: metadata,
            }
        } else {
            Self::Flat(metadata)
        })
    }
}

impl VolumeItem {
    pub fn into_metadata(self) -> BookMetadata {
        match self {
            Self::Nested { volume_info } => volume_info,
            Self::Flat(metadata) => metadata,
        }
    }
}

impl VolumeQueryResult {
    /// Decode a response body
    pub fn from_slice(body: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(body)
    }

    /// Take the first entry, discarding the rest
    pub fn into_first(self) -> Option<BookMetadata> {
        self.items.into_iter().next().map(VolumeItem::into_metadata)
    }
}
