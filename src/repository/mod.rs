//! Storage layer for circulation state
//!
//! The engine talks to storage only through [`CirculationStore`], so the
//! Postgres implementation can be swapped for the in-memory one (or a mock)
//! in tests.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::{
    error::AppResult,
    models::{Book, BorrowDetails, BorrowingRecord, Reservation, ReservationDetails},
};

pub use memory::MemoryCirculationStore;
pub use postgres::PgCirculationStore;

/// Backing store contract for the circulation engine
///
/// Implementations own the transaction lifecycle. `checkout` and
/// `mark_returned` each apply their ledger mutation and inventory
/// adjustment as one atomic unit, serialized per book row and per record
/// row, so concurrent callers cannot drive `available_copies` out of range
/// or credit a return twice.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CirculationStore: Send + Sync {
    /// Look up a book by id
    async fn book(&self, book_id: i64) -> AppResult<Book>;

    /// Current available copy count for a book
    async fn available_copies(&self, book_id: i64) -> AppResult<i32>;

    /// Add `delta` to a book's available copies, rejecting any adjustment
    /// that would leave the count outside `[0, total_copies]`
    async fn adjust_availability(&self, book_id: i64, delta: i32) -> AppResult<()>;

    /// Insert a borrowed record and decrement availability in one unit
    ///
    /// Fails with `Unavailable` when no copy is free, even if the caller's
    /// earlier read saw one.
    async fn checkout(
        &self,
        user_id: i64,
        book_id: i64,
        borrow_date: DateTime<Utc>,
        due_date: DateTime<Utc>,
    ) -> AppResult<BorrowingRecord>;

    /// Look up a borrowing record by id
    async fn record(&self, record_id: i64) -> AppResult<BorrowingRecord>;

    /// Mark a record returned with its computed fine and credit the copy
    /// back to availability, in one unit
    ///
    /// Fails with `AlreadyReturned` on a duplicate return, leaving the fine
    /// and the inventory untouched.
    async fn mark_returned(
        &self,
        record_id: i64,
        return_date: DateTime<Utc>,
        fine: Decimal,
    ) -> AppResult<BorrowingRecord>;

    /// Unreturned records for a user with book details, soonest due first
    async fn active_borrows(&self, user_id: i64) -> AppResult<Vec<BorrowDetails>>;

    /// Insert a pending reservation
    async fn create_reservation(
        &self,
        user_id: i64,
        book_id: i64,
        reservation_date: DateTime<Utc>,
        expiry_date: DateTime<Utc>,
    ) -> AppResult<Reservation>;

    /// Pending reservations for a user with book details, oldest first
    async fn pending_reservations(&self, user_id: i64) -> AppResult<Vec<ReservationDetails>>;

    /// Cancel a pending reservation
    async fn cancel_reservation(&self, reservation_id: i64) -> AppResult<Reservation>;

    /// Expire pending reservations past their expiry date, returning how
    /// many were transitioned
    async fn expire_reservations(&self, now: DateTime<Utc>) -> AppResult<u64>;
}
