//! Final rating: weighted component blend scaled by confidence.

use crate::config::RatingWeights;

/// The four component scores of one trader, each in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ComponentScores {
    pub win: f64,
    pub roi: f64,
    pub pnl: f64,
    /// Higher = riskier
    pub risk: f64,
}

fn unit(x: f64) -> f64 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}

/// `100 · (w_win·W + w_roi·R + w_pnl·P + w_risk·(1 − Risk))`, clamped to [0, 100].
pub fn base_rating(scores: &ComponentScores, weights: &RatingWeights) -> f64 {
    let blend = weights.win * unit(scores.win)
        + weights.roi * unit(scores.roi)
        + weights.pnl * unit(scores.pnl)
        + weights.risk * (1.0 - unit(scores.risk));
    (100.0 * blend).clamp(0.0, 100.0)
}

/// Base rating times confidence, in [0, 100].
pub fn calculate_final_rating(
    scores: &ComponentScores,
    weights: &RatingWeights,
    confidence: f64,
) -> f64 {
    let confidence = unit(confidence);
    if confidence == 0.0 {
        return 0.0;
    }
    (base_rating(scores, weights) * confidence).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario() -> ComponentScores {
        ComponentScores {
            win: 0.60,
            roi: 0.578764,
            pnl: 0.40,
            risk: 0.05,
        }
    }

    #[test]
    fn test_base_rating_default_weights() {
        let base = base_rating(&scenario(), &RatingWeights::default());
        // 100 * (0.18 + 0.1736292 + 0.12 + 0.095)
        assert!((base - 56.86292).abs() < 1e-3);
    }

    #[test]
    fn test_final_rating_scaled_by_confidence() {
        let final_score = calculate_final_rating(&scenario(), &RatingWeights::default(), 0.5296);
        assert!((final_score - 30.1146).abs() < 1e-3);
    }

    #[test]
    fn test_zero_confidence_zeroes_rating() {
        let perfect = ComponentScores {
            win: 1.0,
            roi: 1.0,
            pnl: 1.0,
            risk: 0.0,
        };
        assert_eq!(
            calculate_final_rating(&perfect, &RatingWeights::default(), 0.0),
            0.0
        );
    }

    #[test]
    fn test_components_clamped_before_blend() {
        let wild = ComponentScores {
            win: 3.0,
            roi: 2.0,
            pnl: -1.0,
            risk: -4.0,
        };
        // Clamped to W=1, R=1, P=0, Risk=0 -> 30 + 30 + 0 + 10
        let base = base_rating(&wild, &RatingWeights::default());
        assert!((base - 70.0).abs() < 1e-9);
        assert_eq!(
            calculate_final_rating(&wild, &RatingWeights::default(), 7.0),
            base
        );
    }

    #[test]
    fn test_perfect_trader_tops_out_at_100() {
        let perfect = ComponentScores {
            win: 1.0,
            roi: 1.0,
            pnl: 1.0,
            risk: 0.0,
        };
        let r = calculate_final_rating(&perfect, &RatingWeights::default(), 1.0);
        assert!((r - 100.0).abs() < 1e-9);
    }
}
