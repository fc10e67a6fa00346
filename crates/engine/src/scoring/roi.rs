//! ROI score: logarithmic compression followed by tanh saturation.
//!
//! `score = (1 + tanh(sign(ROI) · ln(1 + |ROI|) / s_ROI)) / 2`
//!
//! Break-even maps to 0.5, gains approach 1 and losses approach 0 with
//! diminishing sensitivity at large magnitudes.

pub const DEFAULT_ROI_SENSITIVITY: f64 = 0.6;

/// Score an ROI given as a decimal fraction (10% -> 0.10).
pub fn calculate_roi_score(roi: f64, sensitivity: f64) -> f64 {
    if roi == 0.0 || roi.is_nan() {
        return 0.5;
    }
    if roi.is_infinite() {
        return if roi > 0.0 { 1.0 } else { 0.0 };
    }

    let sign = roi.signum();
    let scaled = sign * (1.0 + roi.abs()).ln() / sensitivity;
    ((1.0 + scaled.tanh()) / 2.0).clamp(0.0, 1.0)
}

/// Score an ROI given in percent (10.0 -> 10%).
pub fn roi_score_from_percent(roi_percent: f64, sensitivity: f64) -> f64 {
    calculate_roi_score(roi_percent / 100.0, sensitivity)
}

#[cfg(test)]
mod tests {
    use super::*;

    const S: f64 = DEFAULT_ROI_SENSITIVITY;

    #[test]
    fn test_roi_break_even() {
        assert_eq!(calculate_roi_score(0.0, S), 0.5);
        assert_eq!(calculate_roi_score(-0.0, S), 0.5);
    }

    #[test]
    fn test_roi_reference_values() {
        assert!((calculate_roi_score(0.10, S) - 0.579).abs() < 1e-3);
        assert!((calculate_roi_score(0.50, S) - 0.794).abs() < 1e-3);
        assert!((calculate_roi_score(1.00, S) - 0.910).abs() < 1e-3);
        assert!((calculate_roi_score(-0.10, S) - 0.421).abs() < 1e-3);
    }

    #[test]
    fn test_roi_symmetry() {
        for x in [0.01, 0.1, 0.5, 1.0, 3.0, 25.0] {
            let sum = calculate_roi_score(x, S) + calculate_roi_score(-x, S);
            assert!((sum - 1.0).abs() < 1e-12, "asymmetric at {}", x);
        }
    }

    #[test]
    fn test_roi_monotonic_and_saturating() {
        let xs = [-5.0, -1.0, -0.5, -0.1, 0.0, 0.1, 0.5, 1.0, 5.0, 50.0];
        let scores: Vec<f64> = xs.iter().map(|x| calculate_roi_score(*x, S)).collect();
        for w in scores.windows(2) {
            assert!(w[0] < w[1]);
        }
        assert!(scores[0] > 0.0);
        assert!(*scores.last().unwrap() <= 1.0);
        assert!(*scores.last().unwrap() > 0.999);
    }

    #[test]
    fn test_roi_from_percent() {
        assert_eq!(
            roi_score_from_percent(10.0, S),
            calculate_roi_score(0.10, S)
        );
    }

    #[test]
    fn test_roi_non_finite() {
        assert_eq!(calculate_roi_score(f64::NAN, S), 0.5);
        assert_eq!(calculate_roi_score(f64::INFINITY, S), 1.0);
        assert_eq!(calculate_roi_score(f64::NEG_INFINITY, S), 0.0);
    }
}
