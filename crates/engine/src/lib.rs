//! Poly Rank Engine - trader performance scoring for prediction markets
//!
//! Provides:
//! - Pure per-trader score calculators (win, ROI, PnL, risk, confidence, rating)
//! - Population statistics and batch scoring
//! - Leaderboard sort views with stable 1-based ranks
//! - Closed-position aggregation and a Polymarket Data API client
//! - Refresh job persisting scored leaderboards to SQLite
//! - TTL result cache with pluggable backend and clock

pub mod aggregate;
pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod leaderboard;
pub mod population;
pub mod ranking;
pub mod scoring;
pub mod stats;
pub mod types;

// Re-exports for convenience
pub use aggregate::{aggregate_closed_positions, MaxStakeMode};
pub use api::{ClosedPosition, LeaderboardEntry, PolymarketDataClient};
pub use cache::{cache_key, CacheBackend, Clock, InMemoryBackend, SystemClock, TtlCache};
pub use config::{
    ConfidenceParams, InsufficientDataAction, PercentileConfig, RatingWeights, RiskConfig,
    ScoringConfig, ShrinkageConfig,
};
pub use error::{ScoringError, ScoringResult};
pub use leaderboard::{
    load_stored_leaderboard, load_wallets, run_leaderboard_refresh, wallets_from_leaderboard,
    ClosedPositionSource, RefreshOptions, RefreshProgress, RefreshSnapshot, RefreshStatus,
};
pub use population::{
    compute_population_summary, excluded_by_activity_gate, legacy_shrunk_values, score_population,
    score_trader, LegacyShrunk,
};
pub use ranking::{build_all_views, rank_by, SortView};
pub use types::*;
