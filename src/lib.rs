// StreakStore - Daily habit streaks persisted in SQLite

pub mod config;
pub mod error;
pub mod migrations;
pub mod models;
pub mod store;

// Re-export main types for convenience
pub use config::{Clock, Config};
pub use error::ValidationError;
pub use models::{CancelOutcome, ContinueOutcome, Streak, StreakState};
pub use store::StreakStore;
