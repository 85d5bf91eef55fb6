//! Postgres store integration tests
//!
//! Run against a live database with:
//!   DATABASE_URL=postgres://... cargo test --test pg_store -- --ignored

use std::sync::Arc;

use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};

use biblion::error::AppError;
use biblion::models::RecordStatus;
use biblion::repository::{CirculationStore, PgCirculationStore};
use biblion::services::CirculationService;

async fn connect() -> Pool<Postgres> {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("Failed to connect to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    pool
}

async fn seed_book(pool: &Pool<Postgres>, copies: i32) -> i64 {
    sqlx::query_scalar::<_, i64>(
        "INSERT INTO books (title, author, total_copies, available_copies)
         VALUES ('Integration Test Book', 'Test Author', $1, $1)
         RETURNING book_id",
    )
    .bind(copies)
    .fetch_one(pool)
    .await
    .expect("Failed to seed book")
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn borrow_return_cycle() {
    let pool = connect().await;
    let book_id = seed_book(&pool, 1).await;

    let store = Arc::new(PgCirculationStore::new(pool));
    let service = CirculationService::new(store.clone());

    let record = service.borrow(1, book_id).await.expect("borrow failed");
    assert_eq!(record.status, RecordStatus::Borrowed);
    assert_eq!(store.available_copies(book_id).await.unwrap(), 0);

    let err = service.borrow(2, book_id).await.unwrap_err();
    assert!(matches!(err, AppError::Unavailable(_)));

    let fine = service.return_book(record.record_id).await.expect("return failed");
    assert_eq!(fine, Decimal::ZERO);
    assert_eq!(store.available_copies(book_id).await.unwrap(), 1);

    let err = service.return_book(record.record_id).await.unwrap_err();
    assert!(matches!(err, AppError::AlreadyReturned(_)));
}

#[tokio::test(flavor = "multi_thread")]
#[ignore]
async fn concurrent_borrows_race_for_one_copy() {
    let pool = connect().await;
    let book_id = seed_book(&pool, 1).await;

    let store = Arc::new(PgCirculationStore::new(pool));
    let service = CirculationService::new(store.clone());

    let mut handles = Vec::new();
    for user_id in 0..8 {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            service.borrow(user_id, book_id).await
        }));
    }

    let mut successes = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(AppError::Unavailable(_)) => {}
            Err(other) => panic!("unexpected failure: {}", other),
        }
    }

    assert_eq!(successes, 1);
    assert_eq!(store.available_copies(book_id).await.unwrap(), 0);
}
