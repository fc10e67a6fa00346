pub mod polymarket;

pub use polymarket::{ClosedPosition, LeaderboardEntry, PolymarketDataClient};
