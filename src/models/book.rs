//! Book inventory model

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Book row as held by the inventory store
///
/// `total_copies` is immutable once the catalog is seeded; the store keeps
/// `available_copies` inside `[0, total_copies]` at all times.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Book {
    pub book_id: i64,
    pub isbn: Option<String>,
    pub title: String,
    pub author: String,
    pub total_copies: i32,
    pub available_copies: i32,
}
