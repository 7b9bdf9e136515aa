//! Cursor pagination for category listings.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

/// Sort key captured by a category cursor. The variant must match the
/// ordering the next page is requested with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", rename_all = "snake_case")]
pub enum CategorySortKey {
    Title { title: String },
    CreatedAt { at: OffsetDateTime },
    ModifiedAt { at: OffsetDateTime },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CategoryCursorPayload {
    key: CategorySortKey,
    id: Uuid,
}

/// Cursor for paginating categories; positioned after the last row served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryCursor {
    key: CategorySortKey,
    id: Uuid,
}

impl CategoryCursor {
    pub fn new(key: CategorySortKey, id: Uuid) -> Self {
        Self { key, id }
    }

    pub fn key(&self) -> &CategorySortKey {
        &self.key
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn encode(&self) -> String {
        let payload = CategoryCursorPayload {
            key: self.key.clone(),
            id: self.id,
        };
        let serialized = serde_json::to_vec(&payload)
            .expect("serializing category cursor payload should succeed");
        URL_SAFE_NO_PAD.encode(serialized)
    }

    pub fn decode(cursor: &str) -> Result<Self, PaginationError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(cursor)
            .map_err(|err| PaginationError::InvalidCursor(err.to_string()))?;
        let payload: CategoryCursorPayload = serde_json::from_slice(&bytes)
            .map_err(|err| PaginationError::InvalidCursor(err.to_string()))?;
        Ok(Self {
            key: payload.key,
            id: payload.id,
        })
    }
}

/// Cursor-aware pagination request.
#[derive(Debug, Clone)]
pub struct PageRequest<C> {
    pub limit: u32,
    pub cursor: Option<C>,
}

impl<C> PageRequest<C> {
    pub fn new(limit: u32, cursor: Option<C>) -> Self {
        Self { limit, cursor }
    }
}

/// Cursor-aware page result.
#[derive(Debug, Clone, Serialize)]
pub struct CursorPage<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
}

impl<T> CursorPage<T> {
    pub fn new(items: Vec<T>, next_cursor: Option<String>) -> Self {
        Self { items, next_cursor }
    }
}

#[derive(Debug, Error)]
pub enum PaginationError {
    #[error("invalid cursor: {0}")]
    InvalidCursor(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_cursor_survives_encoding() {
        let id = Uuid::new_v4();
        let cursor = CategoryCursor::new(
            CategorySortKey::Title {
                title: "Tech".into(),
            },
            id,
        );

        let decoded = CategoryCursor::decode(&cursor.encode()).expect("decoded cursor");
        assert_eq!(decoded, cursor);
    }

    #[test]
    fn garbage_cursor_is_rejected() {
        assert!(matches!(
            CategoryCursor::decode("not-a-cursor"),
            Err(PaginationError::InvalidCursor(_))
        ));
    }
}
