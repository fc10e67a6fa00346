//! Types for the scoring engine

use serde::{Deserialize, Serialize};

/// Aggregated trading history for one trader, as produced by the data layer.
///
/// Invariants: `winning_stakes <= total_stakes`,
/// `total_trades_with_pnl <= total_trades`, `worst_loss <= 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawTraderMetrics {
    #[serde(alias = "wallet")]
    pub wallet_address: String,
    pub name: Option<String>,
    pub total_trades: u32,
    /// Trades with a realized P&L
    pub total_trades_with_pnl: u32,
    pub winning_trades: u32,
    /// Sum of realized P&L
    pub total_pnl: f64,
    /// Return on investment in percent (10.0 = 10%)
    pub roi: f64,
    /// Count-based win rate in percent
    pub win_rate: f64,
    pub total_stakes: f64,
    pub winning_stakes: f64,
    /// Largest single stake, or the mean of the top five
    pub max_stake: f64,
    /// Σ stake²
    pub sum_sq_stakes: f64,
    pub worst_loss: f64,
    /// Every negative realized P&L
    pub all_losses: Vec<f64>,
}

impl Default for RawTraderMetrics {
    fn default() -> Self {
        Self {
            wallet_address: String::new(),
            name: None,
            total_trades: 0,
            total_trades_with_pnl: 0,
            winning_trades: 0,
            total_pnl: 0.0,
            roi: 0.0,
            win_rate: 0.0,
            total_stakes: 0.0,
            winning_stakes: 0.0,
            max_stake: 0.0,
            sum_sq_stakes: 0.0,
            worst_loss: 0.0,
            all_losses: Vec::new(),
        }
    }
}

/// Whether the risk component met the minimum activity gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskStatus {
    #[default]
    Scored,
    InsufficientData,
}

/// A trader annotated with every sub-score and the final rating
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredTrader {
    #[serde(flatten)]
    pub metrics: RawTraderMetrics,
    pub score_win_rate: f64,
    pub score_roi: f64,
    pub score_pnl: f64,
    /// Higher = riskier
    pub score_risk: f64,
    pub risk_status: RiskStatus,
    pub confidence_score: f64,
    pub confidence_level: String,
    pub final_score: f64,
    /// Legacy "shrunk" values, currently plain copies of the raw inputs
    #[serde(rename = "W_shrunk")]
    pub w_shrunk: f64,
    pub roi_shrunk: f64,
    pub pnl_shrunk: f64,
    pub effective_trade_mass: f64,
    /// Whale-adjusted PnL used for the population median
    pub pnl_adjusted: f64,
    /// 1-based position within a sort view; unset until ranked
    pub rank: Option<u32>,
}

/// Percentile anchors over the qualifying population (reporting only)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PercentileAnchors {
    pub lower_percentile: f64,
    pub upper_percentile: f64,
    pub w_shrunk_lower: f64,
    pub w_shrunk_upper: f64,
    pub roi_shrunk_lower: f64,
    pub roi_shrunk_upper: f64,
    pub pnl_shrunk_lower: f64,
    pub pnl_shrunk_upper: f64,
}

/// Population-level statistics for one scoring batch
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PopulationSummary {
    /// Traders in the qualifying population (falls back to all traders)
    pub population_size: usize,
    pub total_traders: usize,
    /// Traders dropped by the `exclude` minimum-activity policy
    pub excluded_traders: usize,
    pub roi_median: f64,
    pub pnl_median: f64,
    pub anchors: PercentileAnchors,
}

/// Output of one scoring batch
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoringOutcome {
    /// Scored traders in input order, excluded traders removed
    pub traders: Vec<ScoredTrader>,
    pub summary: PopulationSummary,
}
