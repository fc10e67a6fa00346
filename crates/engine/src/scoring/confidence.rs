//! Confidence multiplier from the number of PnL-bearing trades.
//!
//! `Conf(Np) = 1 − exp(−(Np / scale)^exponent)`, rounded to 4 decimals.

use crate::config::ConfidenceParams;

fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

/// Reliability weight in [0, 1]. Non-positive trade counts give 0.
pub fn calculate_confidence_score(num_predictions: i64, params: &ConfidenceParams) -> f64 {
    if num_predictions <= 0 {
        return 0.0;
    }
    let ratio = num_predictions as f64 / params.scale;
    let conf = 1.0 - (-ratio.powf(params.exponent)).exp();
    if conf.is_nan() {
        return 0.0;
    }
    round4(conf.clamp(0.0, 1.0))
}

/// Human-readable bucket for a confidence score
pub fn confidence_level(score: f64) -> &'static str {
    match score {
        s if s >= 0.95 => "Very High",
        s if s >= 0.85 => "High",
        s if s >= 0.70 => "Moderate-High",
        s if s >= 0.50 => "Moderate",
        s if s >= 0.30 => "Low",
        _ => "Very Low",
    }
}
