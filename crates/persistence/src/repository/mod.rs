//! Repository implementations for database operations

pub mod leaderboard;

pub use leaderboard::*;
