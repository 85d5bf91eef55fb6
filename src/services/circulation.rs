//! Circulation engine
//!
//! Orchestrates the inventory store and the circulation ledger: validates a
//! requested transition, then has the store apply the paired ledger and
//! inventory mutations as one atomic unit. All failures come back as typed
//! [`AppError`] outcomes; nothing is retried here.

use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;

use crate::{
    error::{AppError, AppResult},
    fines,
    models::{BorrowDetails, BorrowingRecord, RecordStatus, Reservation, ReservationDetails},
    repository::CirculationStore,
};

/// Fixed loan period for every borrow
const LOAN_PERIOD_DAYS: i64 = 14;

/// Fixed hold period for every reservation
const HOLD_PERIOD_DAYS: i64 = 7;

#[derive(Clone)]
pub struct CirculationService {
    store: Arc<dyn CirculationStore>,
}

impl CirculationService {
    pub fn new(store: Arc<dyn CirculationStore>) -> Self {
        Self { store }
    }

    /// Borrow a book for a user, due back in 14 days
    ///
    /// The pre-read only produces the early failure; the store's `checkout`
    /// is the atomic authority, so a concurrent borrower racing for the
    /// last copy still loses with `Unavailable`. User ids are opaque here;
    /// account validation belongs to the caller.
    pub async fn borrow(&self, user_id: i64, book_id: i64) -> AppResult<BorrowingRecord> {
        let book = self.store.book(book_id).await?;
        if book.available_copies <= 0 {
            return Err(AppError::Unavailable(format!(
                "No available copies of book {}",
                book_id
            )));
        }

        let now = Utc::now();
        let record = self
            .store
            .checkout(user_id, book_id, now, now + Duration::days(LOAN_PERIOD_DAYS))
            .await?;

        tracing::info!(
            record_id = record.record_id,
            user_id,
            book_id,
            "book borrowed"
        );
        Ok(record)
    }

    /// Return a borrowed book, computing the overdue fine exactly once
    ///
    /// The fine is fixed at this transition and never recomputed; a second
    /// return of the same record fails with `AlreadyReturned` and leaves
    /// both the fine and the inventory untouched.
    pub async fn return_book(&self, record_id: i64) -> AppResult<Decimal> {
        let record = self.store.record(record_id).await?;
        if record.status == RecordStatus::Returned {
            return Err(AppError::AlreadyReturned(format!(
                "Record {} was already returned",
                record_id
            )));
        }

        let now = Utc::now();
        let fine = fines::compute_fine(record.due_date, now);
        let record = self.store.mark_returned(record_id, now, fine).await?;

        tracing::info!(record_id, fine = %record.fine_amount, "book returned");
        Ok(record.fine_amount)
    }

    /// Place a hold on a book, expiring in 7 days
    ///
    /// No availability check: a reservation is a request to be queued, not
    /// a withdrawal, so reserving an in-stock book is allowed.
    pub async fn reserve(&self, user_id: i64, book_id: i64) -> AppResult<Reservation> {
        self.store.book(book_id).await?;

        let now = Utc::now();
        let reservation = self
            .store
            .create_reservation(user_id, book_id, now, now + Duration::days(HOLD_PERIOD_DAYS))
            .await?;

        tracing::info!(
            reservation_id = reservation.reservation_id,
            user_id,
            book_id,
            "book reserved"
        );
        Ok(reservation)
    }

    /// Cancel a pending reservation
    pub async fn cancel_reservation(&self, reservation_id: i64) -> AppResult<Reservation> {
        let reservation = self.store.cancel_reservation(reservation_id).await?;
        tracing::info!(reservation_id, "reservation cancelled");
        Ok(reservation)
    }

    /// Active borrows for a user, soonest due first
    pub async fn list_active_borrows(&self, user_id: i64) -> AppResult<Vec<BorrowDetails>> {
        self.store.active_borrows(user_id).await
    }

    /// Pending reservations for a user, oldest first
    pub async fn list_pending_reservations(
        &self,
        user_id: i64,
    ) -> AppResult<Vec<ReservationDetails>> {
        self.store.pending_reservations(user_id).await
    }

    /// Transition pending reservations past their expiry date to expired
    ///
    /// Invoked by the scheduled sweep, not by request handling.
    pub async fn expire_reservations(&self) -> AppResult<u64> {
        let expired = self.store.expire_reservations(Utc::now()).await?;
        if expired > 0 {
            tracing::info!(expired, "reservations expired");
        }
        Ok(expired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Book;
    use crate::repository::MockCirculationStore;
    use chrono::{DateTime, Duration, Utc};
    use mockall::predicate::eq;

    fn borrowed_record(record_id: i64, due_date: DateTime<Utc>) -> BorrowingRecord {
        BorrowingRecord {
            record_id,
            user_id: 10,
            book_id: 1,
            borrow_date: due_date - Duration::days(LOAN_PERIOD_DAYS),
            due_date,
            return_date: None,
            status: RecordStatus::Borrowed,
            fine_amount: Decimal::ZERO,
        }
    }

    #[tokio::test]
    async fn return_three_days_late_charges_one_fifty() {
        // An hour past the third overdue day, to stay clear of the boundary
        let due = Utc::now() - Duration::days(3) - Duration::hours(1);
        let record = borrowed_record(7, due);

        let mut store = MockCirculationStore::new();
        let fetched = record.clone();
        store
            .expect_record()
            .with(eq(7))
            .times(1)
            .returning(move |_| Ok(fetched.clone()));
        store
            .expect_mark_returned()
            .withf(|&record_id, _, &fine| record_id == 7 && fine == Decimal::new(150, 2))
            .times(1)
            .returning(move |record_id, return_date, fine| {
                let mut returned = borrowed_record(record_id, due);
                returned.status = RecordStatus::Returned;
                returned.return_date = Some(return_date);
                returned.fine_amount = fine;
                Ok(returned)
            });

        let service = CirculationService::new(Arc::new(store));
        let fine = service.return_book(7).await.unwrap();
        assert_eq!(fine, Decimal::new(150, 2));
    }

    #[tokio::test]
    async fn duplicate_return_never_reaches_the_store_mutation() {
        let mut record = borrowed_record(7, Utc::now());
        record.status = RecordStatus::Returned;
        record.return_date = Some(Utc::now());

        let mut store = MockCirculationStore::new();
        let fetched = record.clone();
        store
            .expect_record()
            .returning(move |_| Ok(fetched.clone()));
        store.expect_mark_returned().times(0);

        let service = CirculationService::new(Arc::new(store));
        let err = service.return_book(7).await.unwrap_err();
        assert!(matches!(err, AppError::AlreadyReturned(_)));
    }

    #[tokio::test]
    async fn borrow_with_no_copies_never_reaches_checkout() {
        let mut store = MockCirculationStore::new();
        store.expect_book().returning(|book_id| {
            Ok(Book {
                book_id,
                isbn: None,
                title: "Title".into(),
                author: "Author".into(),
                total_copies: 3,
                available_copies: 0,
            })
        });
        store.expect_checkout().times(0);

        let service = CirculationService::new(Arc::new(store));
        let err = service.borrow(10, 1).await.unwrap_err();
        assert!(matches!(err, AppError::Unavailable(_)));
    }
}
