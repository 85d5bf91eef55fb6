//! Borrowing record model and related types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Lifecycle state of a borrowing record
///
/// Transitions borrowed -> returned exactly once; there is no way back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Borrowed,
    Returned,
}

impl std::fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordStatus::Borrowed => write!(f, "borrowed"),
            RecordStatus::Returned => write!(f, "returned"),
        }
    }
}

/// One loan transaction, from checkout to return
///
/// `fine_amount` stays zero until the return transition, where it is written
/// exactly once and never recomputed.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BorrowingRecord {
    pub record_id: i64,
    pub user_id: i64,
    pub book_id: i64,
    pub borrow_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub status: RecordStatus,
    pub fine_amount: Decimal,
}

/// Active borrow with book details for display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BorrowDetails {
    pub record_id: i64,
    pub book_id: i64,
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub borrow_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub is_overdue: bool,
}
