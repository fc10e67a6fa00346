//! Risk score: worst loss relative to total stake.
//!
//! `risk = |worst_loss| / total_stakes`, clamped to [0, 1]. Higher is riskier;
//! the final rating uses `1 − risk`.

use crate::config::{InsufficientDataAction, RiskConfig};

/// How the minimum-activity gate treated a trader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskOutcome {
    Scored,
    /// Below the activity threshold, scored anyway and flagged
    InsufficientData,
    /// Below the activity threshold; must be dropped from leaderboards
    Excluded,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskAssessment {
    pub score: f64,
    pub outcome: RiskOutcome,
}

impl RiskAssessment {
    pub fn is_excluded(&self) -> bool {
        self.outcome == RiskOutcome::Excluded
    }
}

/// Mean magnitude of the `n` most negative losses.
///
/// Only strictly negative entries count; `None` when there are none.
pub fn average_worst_losses(all_losses: &[f64], n: usize) -> Option<f64> {
    let mut losses: Vec<f64> = all_losses
        .iter()
        .copied()
        .filter(|l| *l < 0.0)
        .collect();
    if losses.is_empty() || n == 0 {
        return None;
    }
    losses.sort_by(|a, b| a.total_cmp(b));
    let worst = &losses[..n.min(losses.len())];
    let avg = worst.iter().sum::<f64>() / worst.len() as f64;
    Some(avg.abs())
}

/// Loss magnitude the ratio is built on, honouring `use_avg_n_worst`.
pub fn loss_magnitude(worst_loss: f64, all_losses: &[f64], config: &RiskConfig) -> f64 {
    if config.use_avg_n_worst {
        if let Some(avg) = average_worst_losses(all_losses, config.n_worst_losses) {
            return avg;
        }
    }
    worst_loss.abs()
}

/// Base ratio without any gate
pub fn risk_ratio(loss_magnitude: f64, total_stakes: f64) -> f64 {
    if total_stakes <= 0.0 {
        return 0.0;
    }
    let ratio = loss_magnitude / total_stakes;
    if ratio.is_nan() {
        return 0.0;
    }
    ratio.clamp(0.0, 1.0)
}

/// Full risk assessment including the minimum-activity gate.
pub fn calculate_risk_score(
    worst_loss: f64,
    all_losses: &[f64],
    total_stakes: f64,
    total_trades: u32,
    config: &RiskConfig,
) -> RiskAssessment {
    let below_threshold =
        config.min_activity_enabled && total_trades < config.min_trades_threshold;

    let outcome = match (below_threshold, config.insufficient_data_action) {
        (false, _) | (true, InsufficientDataAction::CalculateAnyway) => RiskOutcome::Scored,
        (true, InsufficientDataAction::MarkInsufficient) => RiskOutcome::InsufficientData,
        (true, InsufficientDataAction::Exclude) => {
            return RiskAssessment {
                score: 0.0,
                outcome: RiskOutcome::Excluded,
            };
        }
    };

    let magnitude = loss_magnitude(worst_loss, all_losses, config);
    RiskAssessment {
        score: risk_ratio(magnitude, total_stakes),
        outcome,
    }
}
