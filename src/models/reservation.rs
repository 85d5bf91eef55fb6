//! Reservation (hold) model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Lifecycle state of a reservation
///
/// Holds start out pending and end in one of the terminal states. No
/// transition produces `fulfilled` yet; how a hold converts into a borrow
/// is still undefined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    Pending,
    Fulfilled,
    Expired,
    Cancelled,
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReservationStatus::Pending => write!(f, "pending"),
            ReservationStatus::Fulfilled => write!(f, "fulfilled"),
            ReservationStatus::Expired => write!(f, "expired"),
            ReservationStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A request to be granted a copy, independent of current stock
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Reservation {
    pub reservation_id: i64,
    pub user_id: i64,
    pub book_id: i64,
    pub reservation_date: DateTime<Utc>,
    pub expiry_date: DateTime<Utc>,
    pub status: ReservationStatus,
}

/// Pending reservation with book details for display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationDetails {
    pub reservation_id: i64,
    pub book_id: i64,
    pub title: String,
    pub author: String,
    pub reservation_date: DateTime<Utc>,
    pub expiry_date: DateTime<Utc>,
    pub status: ReservationStatus,
}
