//! Scoring configuration
//!
//! Every tunable constant of the scoring pipeline lives here so it can be
//! supplied externally (JSON file, API body) without touching the formulas.
//! All sub-structs use `#[serde(default)]`, so a partial document only
//! overrides the fields it names.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{ScoringError, ScoringResult};

/// Allowed deviation of the weight sum from 1.0
pub const WEIGHT_SUM_TOLERANCE: f64 = 0.01;

/// Final rating weights.
///
/// `Rating = 100 × [w_win·W + w_roi·R + w_pnl·P + w_risk·(1 − Risk)]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingWeights {
    pub win: f64,
    pub roi: f64,
    pub pnl: f64,
    pub risk: f64,
}

impl Default for RatingWeights {
    fn default() -> Self {
        Self {
            win: 0.30,
            roi: 0.30,
            pnl: 0.30,
            risk: 0.10,
        }
    }
}

impl RatingWeights {
    pub fn sum(&self) -> f64 {
        self.win + self.roi + self.pnl + self.risk
    }
}

/// What to do with a trader below the minimum activity threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsufficientDataAction {
    /// Drop the trader from leaderboard output
    Exclude,
    /// Score anyway but flag the risk score as insufficient
    MarkInsufficient,
    /// Ignore the gate entirely
    CalculateAnyway,
}

/// Risk score toggles
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Average the N worst losses instead of using the single worst loss
    pub use_avg_n_worst: bool,
    pub n_worst_losses: usize,
    pub min_activity_enabled: bool,
    pub min_trades_threshold: u32,
    pub insufficient_data_action: InsufficientDataAction,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            use_avg_n_worst: false,
            n_worst_losses: 5,
            min_activity_enabled: false,
            min_trades_threshold: 10,
            insufficient_data_action: InsufficientDataAction::Exclude,
        }
    }
}

/// Percentile bounds used for the reporting anchors
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PercentileConfig {
    pub lower: f64,
    pub upper: f64,
}

impl Default for PercentileConfig {
    fn default() -> Self {
        Self {
            lower: 1.0,
            upper: 99.0,
        }
    }
}

/// `Conf(Np) = 1 − exp(−(Np/scale)^exponent)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceParams {
    pub scale: f64,
    pub exponent: f64,
}

impl Default for ConfidenceParams {
    fn default() -> Self {
        Self {
            scale: 16.0,
            exponent: 0.60,
        }
    }
}

/// Shrinkage constants kept for population reporting.
///
/// These do not feed the final rating.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShrinkageConfig {
    pub k_win: f64,
    /// Baseline win rate as a fraction (0.5 = 50%)
    pub baseline_win_rate: f64,
    pub k_roi: f64,
    pub k_pnl: f64,
}

impl Default for ShrinkageConfig {
    fn default() -> Self {
        Self {
            k_win: 50.0,
            baseline_win_rate: 0.5,
            k_roi: 50.0,
            k_pnl: 50.0,
        }
    }
}

/// Full scoring configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub weights: RatingWeights,
    pub risk: RiskConfig,
    pub percentiles: PercentileConfig,
    /// Minimum trades to join the qualifying population
    pub population_min_trades: u32,
    /// `s_ROI` in the ROI transform
    pub roi_sensitivity: f64,
    pub confidence: ConfidenceParams,
    /// Whale penalty strength α
    pub whale_alpha: f64,
    pub shrinkage: ShrinkageConfig,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: RatingWeights::default(),
            risk: RiskConfig::default(),
            percentiles: PercentileConfig::default(),
            population_min_trades: 5,
            roi_sensitivity: 0.6,
            confidence: ConfidenceParams::default(),
            whale_alpha: 4.0,
            shrinkage: ShrinkageConfig::default(),
        }
    }
}

impl ScoringConfig {
    /// Load a (possibly partial) configuration from a JSON file and validate it.
    pub fn from_json_file(path: impl AsRef<Path>) -> ScoringResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the formulas cannot honour.
    pub fn validate(&self) -> ScoringResult<()> {
        let sum = self.weights.sum();
        if !sum.is_finite() || (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ScoringError::InvalidWeights { sum });
        }

        let PercentileConfig { lower, upper } = self.percentiles;
        if !(0.0..=100.0).contains(&lower) || !(0.0..=100.0).contains(&upper) || lower >= upper {
            return Err(ScoringError::InvalidPercentiles { lower, upper });
        }

        if self.risk.n_worst_losses < 1 {
            return Err(ScoringError::InvalidRiskConfig(
                "n_worst_losses must be >= 1".into(),
            ));
        }

        if !(self.confidence.scale > 0.0 && self.confidence.scale.is_finite()) {
            return Err(ScoringError::InvalidParameter(format!(
                "confidence scale must be positive, got {}",
                self.confidence.scale
            )));
        }
        if !(self.confidence.exponent > 0.0 && self.confidence.exponent.is_finite()) {
            return Err(ScoringError::InvalidParameter(format!(
                "confidence exponent must be positive, got {}",
                self.confidence.exponent
            )));
        }
        if !(self.roi_sensitivity > 0.0 && self.roi_sensitivity.is_finite()) {
            return Err(ScoringError::InvalidParameter(format!(
                "roi_sensitivity must be positive, got {}",
                self.roi_sensitivity
            )));
        }
        if !(self.whale_alpha >= 0.0 && self.whale_alpha.is_finite()) {
            return Err(ScoringError::InvalidParameter(format!(
                "whale_alpha must be non-negative, got {}",
                self.whale_alpha
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ScoringConfig::default();
        assert!(config.validate().is_ok());
        assert!((config.weights.sum() - 1.0).abs() < 1e-12);
        assert_eq!(config.risk.n_worst_losses, 5);
        assert_eq!(config.risk.min_trades_threshold, 10);
        assert_eq!(config.population_min_trades, 5);
    }

    #[test]
    fn test_weights_within_tolerance_accepted() {
        let mut config = ScoringConfig::default();
        config.weights.risk = 0.105;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_weights_outside_tolerance_rejected() {
        let mut config = ScoringConfig::default();
        config.weights.win = 0.40;
        match config.validate() {
            Err(ScoringError::InvalidWeights { sum }) => assert!((sum - 1.10).abs() < 1e-9),
            other => panic!("expected InvalidWeights, got {:?}", other),
        }
    }

    #[test]
    fn test_inverted_percentiles_rejected() {
        let mut config = ScoringConfig::default();
        config.percentiles = PercentileConfig {
            lower: 90.0,
            upper: 10.0,
        };
        assert!(matches!(
            config.validate(),
            Err(ScoringError::InvalidPercentiles { .. })
        ));
    }

    #[test]
    fn test_zero_worst_losses_rejected() {
        let mut config = ScoringConfig::default();
        config.risk.n_worst_losses = 0;
        assert!(matches!(
            config.validate(),
            Err(ScoringError::InvalidRiskConfig(_))
        ));
    }

    #[test]
    fn test_non_positive_confidence_scale_rejected() {
        let mut config = ScoringConfig::default();
        config.confidence.scale = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ScoringError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ScoringConfig = serde_json::from_str(
            r#"{ "risk": { "use_avg_n_worst": true, "insufficient_data_action": "mark_insufficient" } }"#,
        )
        .unwrap();
        assert!(config.risk.use_avg_n_worst);
        assert_eq!(config.risk.n_worst_losses, 5);
        assert_eq!(
            config.risk.insufficient_data_action,
            InsufficientDataAction::MarkInsufficient
        );
        assert_eq!(config.weights, RatingWeights::default());
        assert_eq!(config.roi_sensitivity, 0.6);
    }

    #[test]
    fn test_from_json_file_missing_path() {
        let err = ScoringConfig::from_json_file("/nonexistent/scoring.json").unwrap_err();
        assert!(matches!(err, ScoringError::Io(_)));
    }
}
