//! Population statistics and batch scoring
//!
//! Traders the minimum-activity gate excludes are dropped up front. The rest
//! go through two passes:
//! 1. population figures (medians, percentile anchors) over the qualifying set
//! 2. per-trader scoring with every calculator
//!
//! Pass 1 is reporting only and does not feed the per-trader scores.

use serde::Serialize;
use tracing::{debug, info};

use crate::config::ScoringConfig;
use crate::error::ScoringResult;
use crate::scoring::{
    calculate_confidence_score, calculate_final_rating, calculate_pnl_score,
    calculate_risk_score, calculate_win_score, confidence_level, roi_score_from_percent,
    ComponentScores, RiskOutcome,
};
use crate::stats::{
    effective_trade_mass_from_sums, median, percentile, shrink_toward, whale_adjusted_pnl,
};
use crate::types::{
    PercentileAnchors, PopulationSummary, RawTraderMetrics, RiskStatus, ScoredTrader,
    ScoringOutcome,
};

// ---------------------------------------------------------------------------
// Pass 1: population
// ---------------------------------------------------------------------------

/// True when the `exclude` minimum-activity policy drops this trader.
pub fn excluded_by_activity_gate(trader: &RawTraderMetrics, config: &ScoringConfig) -> bool {
    calculate_risk_score(
        trader.worst_loss,
        &trader.all_losses,
        trader.total_stakes,
        trader.total_trades,
        &config.risk,
    )
    .is_excluded()
}

/// Traders with at least `min_trades` trades, or everyone if none qualify.
pub fn qualifying_population(
    traders: &[RawTraderMetrics],
    min_trades: u32,
) -> Vec<&RawTraderMetrics> {
    qualifying(traders.iter().collect(), min_trades)
}

fn qualifying(candidates: Vec<&RawTraderMetrics>, min_trades: u32) -> Vec<&RawTraderMetrics> {
    let qualifying: Vec<&RawTraderMetrics> = candidates
        .iter()
        .copied()
        .filter(|t| t.total_trades >= min_trades)
        .collect();
    if qualifying.is_empty() {
        candidates
    } else {
        qualifying
    }
}

/// Medians and percentile anchors for a batch.
///
/// Traders excluded by the activity gate never join the population; they
/// are counted in `excluded_traders`.
pub fn compute_population_summary(
    traders: &[RawTraderMetrics],
    config: &ScoringConfig,
) -> PopulationSummary {
    let admitted: Vec<&RawTraderMetrics> = traders
        .iter()
        .filter(|t| !excluded_by_activity_gate(t, config))
        .collect();
    let excluded_traders = traders.len() - admitted.len();
    let population = qualifying(admitted, config.population_min_trades);

    let rois: Vec<f64> = population.iter().map(|t| t.roi).collect();
    let adjusted_pnls: Vec<f64> = population
        .iter()
        .map(|t| whale_adjusted_pnl(t.total_pnl, t.max_stake, t.total_stakes, config.whale_alpha))
        .collect();
    let win_rates: Vec<f64> = population.iter().map(|t| t.win_rate).collect();
    let raw_pnls: Vec<f64> = population.iter().map(|t| t.total_pnl).collect();

    let (lower, upper) = (config.percentiles.lower, config.percentiles.upper);
    let anchors = PercentileAnchors {
        lower_percentile: lower,
        upper_percentile: upper,
        w_shrunk_lower: percentile(&win_rates, lower),
        w_shrunk_upper: percentile(&win_rates, upper),
        roi_shrunk_lower: percentile(&rois, lower),
        roi_shrunk_upper: percentile(&rois, upper),
        pnl_shrunk_lower: percentile(&raw_pnls, lower),
        pnl_shrunk_upper: percentile(&raw_pnls, upper),
    };

    PopulationSummary {
        population_size: population.len(),
        total_traders: traders.len(),
        excluded_traders,
        roi_median: median(&rois),
        pnl_median: median(&adjusted_pnls),
        anchors,
    }
}

// ---------------------------------------------------------------------------
// Pass 2: per-trader scoring
// ---------------------------------------------------------------------------

/// Run every calculator on one trader. `None` when the activity gate excludes it.
pub fn score_trader(trader: &RawTraderMetrics, config: &ScoringConfig) -> Option<ScoredTrader> {
    let risk = calculate_risk_score(
        trader.worst_loss,
        &trader.all_losses,
        trader.total_stakes,
        trader.total_trades,
        &config.risk,
    );
    let risk_status = match risk.outcome {
        RiskOutcome::Excluded => return None,
        RiskOutcome::InsufficientData => RiskStatus::InsufficientData,
        RiskOutcome::Scored => RiskStatus::Scored,
    };

    let components = ComponentScores {
        win: calculate_win_score(trader.win_rate, trader.winning_stakes, trader.total_stakes),
        roi: roi_score_from_percent(trader.roi, config.roi_sensitivity),
        pnl: calculate_pnl_score(trader.total_pnl),
        risk: risk.score,
    };
    let confidence =
        calculate_confidence_score(i64::from(trader.total_trades_with_pnl), &config.confidence);
    let final_score = calculate_final_rating(&components, &config.weights, confidence);

    Some(ScoredTrader {
        metrics: trader.clone(),
        score_win_rate: components.win,
        score_roi: components.roi,
        score_pnl: components.pnl,
        score_risk: components.risk,
        risk_status,
        confidence_score: confidence,
        confidence_level: confidence_level(confidence).to_string(),
        final_score,
        w_shrunk: trader.win_rate,
        roi_shrunk: trader.roi,
        pnl_shrunk: trader.total_pnl,
        effective_trade_mass: effective_trade_mass_from_sums(
            trader.total_stakes,
            trader.sum_sq_stakes,
        ),
        pnl_adjusted: whale_adjusted_pnl(
            trader.total_pnl,
            trader.max_stake,
            trader.total_stakes,
            config.whale_alpha,
        ),
        rank: None,
    })
}

/// Score a batch. Output keeps input order; excluded traders are dropped
/// and counted in the summary.
pub fn score_population(
    traders: &[RawTraderMetrics],
    config: &ScoringConfig,
) -> ScoringResult<ScoringOutcome> {
    config.validate()?;

    let summary = compute_population_summary(traders, config);
    debug!(
        population = summary.population_size,
        roi_median = summary.roi_median,
        pnl_median = summary.pnl_median,
        "Population statistics computed"
    );
    debug!(anchors = ?summary.anchors, "Percentile anchors");

    let scored: Vec<ScoredTrader> = traders
        .iter()
        .filter_map(|t| score_trader(t, config))
        .collect();

    info!(
        total = summary.total_traders,
        scored = scored.len(),
        excluded = summary.excluded_traders,
        "Scored trader batch"
    );

    Ok(ScoringOutcome {
        traders: scored,
        summary,
    })
}

// ---------------------------------------------------------------------------
// Legacy shrinkage (reporting only)
// ---------------------------------------------------------------------------

/// Win rate, ROI and PnL pulled toward population baselines by N_eff.
///
/// The `*_shrunk` fields of [`ScoredTrader`] stay raw copies; these values
/// are computed on request and never feed `final_score`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LegacyShrunk {
    /// Fraction, shrunk toward `baseline_win_rate`
    pub win_rate: f64,
    /// Percent, shrunk toward the ROI median
    pub roi: f64,
    /// Whale-adjusted PnL shrunk toward the PnL median
    pub pnl: f64,
}

pub fn legacy_shrunk_values(
    trader: &RawTraderMetrics,
    summary: &PopulationSummary,
    config: &ScoringConfig,
) -> LegacyShrunk {
    let k = &config.shrinkage;
    let n_eff = effective_trade_mass_from_sums(trader.total_stakes, trader.sum_sq_stakes);
    let pnl_adj = whale_adjusted_pnl(
        trader.total_pnl,
        trader.max_stake,
        trader.total_stakes,
        config.whale_alpha,
    );
    LegacyShrunk {
        win_rate: shrink_toward(trader.win_rate / 100.0, k.baseline_win_rate, n_eff, k.k_win),
        roi: shrink_toward(trader.roi, summary.roi_median, n_eff, k.k_roi),
        pnl: shrink_toward(pnl_adj, summary.pnl_median, n_eff, k.k_pnl),
    }
}
