//! In-memory circulation store
//!
//! Holds every mutation under one lock, which gives the same per-book and
//! per-record serialization the Postgres store gets from transactions.
//! Used as the test double for the engine and for local experiments;
//! catalog seeding happens through [`MemoryCirculationStore::insert_book`].

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::Mutex;

use crate::{
    error::{AppError, AppResult},
    models::{
        Book, BorrowDetails, BorrowingRecord, RecordStatus, Reservation, ReservationDetails,
        ReservationStatus,
    },
};

use super::CirculationStore;

#[derive(Default)]
struct Inner {
    books: HashMap<i64, Book>,
    records: BTreeMap<i64, BorrowingRecord>,
    reservations: BTreeMap<i64, Reservation>,
    next_record_id: i64,
    next_reservation_id: i64,
}

#[derive(Default)]
pub struct MemoryCirculationStore {
    inner: Mutex<Inner>,
}

impl MemoryCirculationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a book into the catalog
    pub async fn insert_book(&self, book: Book) {
        self.inner.lock().await.books.insert(book.book_id, book);
    }
}

fn book_not_found(book_id: i64) -> AppError {
    AppError::NotFound(format!("Book with id {} not found", book_id))
}

#[async_trait]
impl CirculationStore for MemoryCirculationStore {
    async fn book(&self, book_id: i64) -> AppResult<Book> {
        self.inner
            .lock()
            .await
            .books
            .get(&book_id)
            .cloned()
            .ok_or_else(|| book_not_found(book_id))
    }

    async fn available_copies(&self, book_id: i64) -> AppResult<i32> {
        Ok(self.book(book_id).await?.available_copies)
    }

    async fn adjust_availability(&self, book_id: i64, delta: i32) -> AppResult<()> {
        let mut inner = self.inner.lock().await;
        let book = inner
            .books
            .get_mut(&book_id)
            .ok_or_else(|| book_not_found(book_id))?;

        let adjusted = book.available_copies + delta;
        if adjusted < 0 || adjusted > book.total_copies {
            return Err(AppError::InvalidInput(format!(
                "Adjustment {} out of range for book {}",
                delta, book_id
            )));
        }

        book.available_copies = adjusted;
        Ok(())
    }

    async fn checkout(
        &self,
        user_id: i64,
        book_id: i64,
        borrow_date: DateTime<Utc>,
        due_date: DateTime<Utc>,
    ) -> AppResult<BorrowingRecord> {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;

        let book = inner
            .books
            .get_mut(&book_id)
            .ok_or_else(|| book_not_found(book_id))?;

        if book.available_copies <= 0 {
            return Err(AppError::Unavailable(format!(
                "No available copies of book {}",
                book_id
            )));
        }
        book.available_copies -= 1;

        inner.next_record_id += 1;
        let record = BorrowingRecord {
            record_id: inner.next_record_id,
            user_id,
            book_id,
            borrow_date,
            due_date,
            return_date: None,
            status: RecordStatus::Borrowed,
            fine_amount: Decimal::ZERO,
        };
        inner.records.insert(record.record_id, record.clone());

        Ok(record)
    }

    async fn record(&self, record_id: i64) -> AppResult<BorrowingRecord> {
        self.inner
            .lock()
            .await
            .records
            .get(&record_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Borrowing record {} not found", record_id)))
    }

    async fn mark_returned(
        &self,
        record_id: i64,
        return_date: DateTime<Utc>,
        fine: Decimal,
    ) -> AppResult<BorrowingRecord> {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;

        let record = inner
            .records
            .get_mut(&record_id)
            .ok_or_else(|| AppError::NotFound(format!("Borrowing record {} not found", record_id)))?;

        if record.status == RecordStatus::Returned {
            return Err(AppError::AlreadyReturned(format!(
                "Record {} was already returned",
                record_id
            )));
        }

        record.status = RecordStatus::Returned;
        record.return_date = Some(return_date);
        record.fine_amount = fine;
        let record = record.clone();

        if let Some(book) = inner.books.get_mut(&record.book_id) {
            if book.available_copies < book.total_copies {
                book.available_copies += 1;
            } else {
                tracing::warn!(
                    book_id = record.book_id,
                    record_id,
                    "return credited no copy: availability already at total"
                );
            }
        }

        Ok(record)
    }

    async fn active_borrows(&self, user_id: i64) -> AppResult<Vec<BorrowDetails>> {
        let inner = self.inner.lock().await;
        let now = Utc::now();

        let mut result = Vec::new();
        for record in inner.records.values() {
            if record.user_id != user_id || record.status != RecordStatus::Borrowed {
                continue;
            }
            let book = inner
                .books
                .get(&record.book_id)
                .ok_or_else(|| book_not_found(record.book_id))?;

            result.push(BorrowDetails {
                record_id: record.record_id,
                book_id: record.book_id,
                title: book.title.clone(),
                author: book.author.clone(),
                isbn: book.isbn.clone(),
                borrow_date: record.borrow_date,
                due_date: record.due_date,
                is_overdue: record.due_date < now,
            });
        }

        result.sort_by_key(|d| d.due_date);
        Ok(result)
    }

    async fn create_reservation(
        &self,
        user_id: i64,
        book_id: i64,
        reservation_date: DateTime<Utc>,
        expiry_date: DateTime<Utc>,
    ) -> AppResult<Reservation> {
        let mut inner = self.inner.lock().await;

        if !inner.books.contains_key(&book_id) {
            return Err(book_not_found(book_id));
        }

        inner.next_reservation_id += 1;
        let reservation = Reservation {
            reservation_id: inner.next_reservation_id,
            user_id,
            book_id,
            reservation_date,
            expiry_date,
            status: ReservationStatus::Pending,
        };
        inner
            .reservations
            .insert(reservation.reservation_id, reservation.clone());

        Ok(reservation)
    }

    async fn pending_reservations(&self, user_id: i64) -> AppResult<Vec<ReservationDetails>> {
        let inner = self.inner.lock().await;

        let mut result = Vec::new();
        for reservation in inner.reservations.values() {
            if reservation.user_id != user_id || reservation.status != ReservationStatus::Pending {
                continue;
            }
            let book = inner
                .books
                .get(&reservation.book_id)
                .ok_or_else(|| book_not_found(reservation.book_id))?;

            result.push(ReservationDetails {
                reservation_id: reservation.reservation_id,
                book_id: reservation.book_id,
                title: book.title.clone(),
                author: book.author.clone(),
                reservation_date: reservation.reservation_date,
                expiry_date: reservation.expiry_date,
                status: reservation.status,
            });
        }

        result.sort_by_key(|d| d.reservation_date);
        Ok(result)
    }

    async fn cancel_reservation(&self, reservation_id: i64) -> AppResult<Reservation> {
        let mut inner = self.inner.lock().await;

        let reservation = inner
            .reservations
            .get_mut(&reservation_id)
            .ok_or_else(|| {
                AppError::NotFound(format!("Reservation {} not found", reservation_id))
            })?;

        if reservation.status != ReservationStatus::Pending {
            return Err(AppError::InvalidInput(format!(
                "Reservation {} is {}, only pending reservations can be cancelled",
                reservation_id, reservation.status
            )));
        }

        reservation.status = ReservationStatus::Cancelled;
        Ok(reservation.clone())
    }

    async fn expire_reservations(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let mut inner = self.inner.lock().await;

        let mut expired = 0;
        for reservation in inner.reservations.values_mut() {
            if reservation.status == ReservationStatus::Pending && reservation.expiry_date < now {
                reservation.status = ReservationStatus::Expired;
                expired += 1;
            }
        }

        Ok(expired)
    }
}
