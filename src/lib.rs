//! Biblion Library Circulation Engine
//!
//! Core of a library circulation backend: keeps book availability counts,
//! borrowing records, and reservations mutually consistent under concurrent
//! access, and computes overdue fines deterministically. User management,
//! catalog search, and the HTTP surface live in the surrounding application
//! and talk to this crate through [`CirculationService`].

pub mod config;
pub mod error;
pub mod fines;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use services::CirculationService;
