//! Business logic services

pub mod circulation;

pub use circulation::CirculationService;
