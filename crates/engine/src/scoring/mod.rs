//! Per-trader score calculators
//!
//! Each calculator is a pure function over a few raw metrics:
//! - `win`: count and stake weighted win rate
//! - `roi`: log/tanh saturation of ROI
//! - `pnl`: zone-based log interpolation of total PnL
//! - `risk`: worst loss relative to stake, with the activity gate
//! - `confidence`: sample-size multiplier
//! - `rating`: weighted blend of the above

pub mod confidence;
pub mod pnl;
pub mod rating;
pub mod risk;
pub mod roi;
pub mod win;

pub use confidence::{calculate_confidence_score, confidence_level};
pub use pnl::calculate_pnl_score;
pub use rating::{base_rating, calculate_final_rating, ComponentScores};
pub use risk::{calculate_risk_score, RiskAssessment, RiskOutcome};
pub use roi::{calculate_roi_score, roi_score_from_percent};
pub use win::calculate_win_score;
