//! Data models for circulation state

pub mod book;
pub mod record;
pub mod reservation;

// Re-export commonly used types
pub use book::Book;
pub use record::{BorrowDetails, BorrowingRecord, RecordStatus};
pub use reservation::{Reservation, ReservationDetails, ReservationStatus};
