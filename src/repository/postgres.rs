//! Postgres-backed circulation store
//!
//! The two critical read-check-write sequences run inside a single
//! transaction each: `checkout` claims a copy with a conditional decrement
//! and checks the affected-row count, `mark_returned` locks the record row
//! with `SELECT ... FOR UPDATE` before writing the terminal state.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Pool, Postgres, Row};

use crate::{
    error::{AppError, AppResult},
    models::{
        Book, BorrowDetails, BorrowingRecord, RecordStatus, Reservation, ReservationDetails,
        ReservationStatus,
    },
};

use super::CirculationStore;

const RECORD_COLUMNS: &str =
    "record_id, user_id, book_id, borrow_date, due_date, return_date, status, fine_amount";

const RESERVATION_COLUMNS: &str =
    "reservation_id, user_id, book_id, reservation_date, expiry_date, status";

#[derive(Clone)]
pub struct PgCirculationStore {
    pool: Pool<Postgres>,
}

impl PgCirculationStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CirculationStore for PgCirculationStore {
    async fn book(&self, book_id: i64) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(
            "SELECT book_id, isbn, title, author, total_copies, available_copies
             FROM books WHERE book_id = $1",
        )
        .bind(book_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", book_id)))
    }

    async fn available_copies(&self, book_id: i64) -> AppResult<i32> {
        sqlx::query_scalar::<_, i32>("SELECT available_copies FROM books WHERE book_id = $1")
            .bind(book_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", book_id)))
    }

    async fn adjust_availability(&self, book_id: i64, delta: i32) -> AppResult<()> {
        let updated = sqlx::query(
            "UPDATE books
             SET available_copies = available_copies + $2
             WHERE book_id = $1
               AND available_copies + $2 BETWEEN 0 AND total_copies",
        )
        .bind(book_id)
        .bind(delta)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if updated == 0 {
            // Distinguish a missing book from an out-of-range adjustment
            self.book(book_id).await?;
            return Err(AppError::InvalidInput(format!(
                "Adjustment {} out of range for book {}",
                delta, book_id
            )));
        }

        Ok(())
    }

    async fn checkout(
        &self,
        user_id: i64,
        book_id: i64,
        borrow_date: DateTime<Utc>,
        due_date: DateTime<Utc>,
    ) -> AppResult<BorrowingRecord> {
        let mut tx = self.pool.begin().await?;

        // Conditional decrement: only one of N concurrent checkouts can
        // claim the last copy.
        let claimed = sqlx::query(
            "UPDATE books
             SET available_copies = available_copies - 1
             WHERE book_id = $1 AND available_copies > 0",
        )
        .bind(book_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if claimed == 0 {
            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE book_id = $1)")
                    .bind(book_id)
                    .fetch_one(&mut *tx)
                    .await?;

            return Err(if exists {
                AppError::Unavailable(format!("No available copies of book {}", book_id))
            } else {
                AppError::NotFound(format!("Book with id {} not found", book_id))
            });
        }

        let record = sqlx::query_as::<_, BorrowingRecord>(&format!(
            "INSERT INTO borrowing_records (user_id, book_id, borrow_date, due_date)
             VALUES ($1, $2, $3, $4)
             RETURNING {RECORD_COLUMNS}"
        ))
        .bind(user_id)
        .bind(book_id)
        .bind(borrow_date)
        .bind(due_date)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(record)
    }

    async fn record(&self, record_id: i64) -> AppResult<BorrowingRecord> {
        sqlx::query_as::<_, BorrowingRecord>(&format!(
            "SELECT {RECORD_COLUMNS} FROM borrowing_records WHERE record_id = $1"
        ))
        .bind(record_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Borrowing record {} not found", record_id)))
    }

    async fn mark_returned(
        &self,
        record_id: i64,
        return_date: DateTime<Utc>,
        fine: Decimal,
    ) -> AppResult<BorrowingRecord> {
        let mut tx = self.pool.begin().await?;

        // Row lock serializes duplicate returns on the same record
        let record = sqlx::query_as::<_, BorrowingRecord>(&format!(
            "SELECT {RECORD_COLUMNS} FROM borrowing_records WHERE record_id = $1 FOR UPDATE"
        ))
        .bind(record_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Borrowing record {} not found", record_id)))?;

        if record.status == RecordStatus::Returned {
            return Err(AppError::AlreadyReturned(format!(
                "Record {} was already returned",
                record_id
            )));
        }

        let record = sqlx::query_as::<_, BorrowingRecord>(&format!(
            "UPDATE borrowing_records
             SET return_date = $2, status = 'returned', fine_amount = $3
             WHERE record_id = $1
             RETURNING {RECORD_COLUMNS}"
        ))
        .bind(record_id)
        .bind(return_date)
        .bind(fine)
        .fetch_one(&mut *tx)
        .await?;

        let credited = sqlx::query(
            "UPDATE books
             SET available_copies = available_copies + 1
             WHERE book_id = $1 AND available_copies < total_copies",
        )
        .bind(record.book_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if credited == 0 {
            tracing::warn!(
                book_id = record.book_id,
                record_id,
                "return credited no copy: availability already at total"
            );
        }

        tx.commit().await?;
        Ok(record)
    }

    async fn active_borrows(&self, user_id: i64) -> AppResult<Vec<BorrowDetails>> {
        let rows = sqlx::query(
            "SELECT br.record_id, br.book_id, br.borrow_date, br.due_date,
                    b.title, b.author, b.isbn
             FROM borrowing_records br
             JOIN books b ON br.book_id = b.book_id
             WHERE br.user_id = $1 AND br.status = 'borrowed'
             ORDER BY br.due_date",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let now = Utc::now();

        let mut result = Vec::new();
        for row in rows {
            let due_date: DateTime<Utc> = row.get("due_date");
            result.push(BorrowDetails {
                record_id: row.get("record_id"),
                book_id: row.get("book_id"),
                title: row.get("title"),
                author: row.get("author"),
                isbn: row.get("isbn"),
                borrow_date: row.get("borrow_date"),
                due_date,
                is_overdue: due_date < now,
            });
        }

        Ok(result)
    }

    async fn create_reservation(
        &self,
        user_id: i64,
        book_id: i64,
        reservation_date: DateTime<Utc>,
        expiry_date: DateTime<Utc>,
    ) -> AppResult<Reservation> {
        let reservation = sqlx::query_as::<_, Reservation>(&format!(
            "INSERT INTO reservations (user_id, book_id, reservation_date, expiry_date)
             VALUES ($1, $2, $3, $4)
             RETURNING {RESERVATION_COLUMNS}"
        ))
        .bind(user_id)
        .bind(book_id)
        .bind(reservation_date)
        .bind(expiry_date)
        .fetch_one(&self.pool)
        .await?;

        Ok(reservation)
    }

    async fn pending_reservations(&self, user_id: i64) -> AppResult<Vec<ReservationDetails>> {
        let rows = sqlx::query(
            "SELECT r.reservation_id, r.book_id, r.reservation_date, r.expiry_date, r.status,
                    b.title, b.author
             FROM reservations r
             JOIN books b ON r.book_id = b.book_id
             WHERE r.user_id = $1 AND r.status = 'pending'
             ORDER BY r.reservation_date",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut result = Vec::new();
        for row in rows {
            result.push(ReservationDetails {
                reservation_id: row.get("reservation_id"),
                book_id: row.get("book_id"),
                title: row.get("title"),
                author: row.get("author"),
                reservation_date: row.get("reservation_date"),
                expiry_date: row.get("expiry_date"),
                status: row.get("status"),
            });
        }

        Ok(result)
    }

    async fn cancel_reservation(&self, reservation_id: i64) -> AppResult<Reservation> {
        let mut tx = self.pool.begin().await?;

        let reservation = sqlx::query_as::<_, Reservation>(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations WHERE reservation_id = $1 FOR UPDATE"
        ))
        .bind(reservation_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("Reservation {} not found", reservation_id))
        })?;

        if reservation.status != ReservationStatus::Pending {
            return Err(AppError::InvalidInput(format!(
                "Reservation {} is {}, only pending reservations can be cancelled",
                reservation_id, reservation.status
            )));
        }

        let reservation = sqlx::query_as::<_, Reservation>(&format!(
            "UPDATE reservations SET status = 'cancelled'
             WHERE reservation_id = $1
             RETURNING {RESERVATION_COLUMNS}"
        ))
        .bind(reservation_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(reservation)
    }

    async fn expire_reservations(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let expired = sqlx::query(
            "UPDATE reservations SET status = 'expired'
             WHERE status = 'pending' AND expiry_date < $1",
        )
        .bind(now)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(expired)
    }
}
