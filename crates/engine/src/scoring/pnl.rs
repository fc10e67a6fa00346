//! PnL score: zone-based logarithmic interpolation on |PnL|
//!
//! Each zone maps `[lower, upper)` onto a score band; inside a zone the score
//! moves linearly in `ln(x)`, so each order of magnitude adds a roughly
//! constant increment. Profits and losses use separate zone tables.

/// Score of a break-even trader, and of any profit below $1
pub const BREAK_EVEN_SCORE: f64 = 0.15;

/// Loss magnitude below which the score stays at break-even
const SMALL_LOSS_LIMIT: f64 = 100.0;

/// Profit at or above which the score is 1.0
const PROFIT_CAP: f64 = 1_000_000.0;

#[derive(Debug, Clone, Copy)]
struct PnlZone {
    lower: f64,
    upper: f64,
    score_at_lower: f64,
    score_at_upper: f64,
}

const fn zone(lower: f64, upper: f64, score_at_lower: f64, score_at_upper: f64) -> PnlZone {
    PnlZone {
        lower,
        upper,
        score_at_lower,
        score_at_upper,
    }
}

const PROFIT_ZONES: [PnlZone; 8] = [
    zone(1.0, 100.0, 0.15, 0.25),
    zone(100.0, 1_000.0, 0.25, 0.40),
    zone(1_000.0, 5_000.0, 0.40, 0.60),
    zone(5_000.0, 10_000.0, 0.60, 0.75),
    zone(10_000.0, 50_000.0, 0.75, 0.85),
    zone(50_000.0, 100_000.0, 0.85, 0.92),
    zone(100_000.0, 500_000.0, 0.92, 0.98),
    zone(500_000.0, 1_000_000.0, 0.98, 0.999),
];

/// Keyed on |PnL|; the last band reaches 0 at a $1M loss.
const LOSS_ZONES: [PnlZone; 3] = [
    zone(100.0, 1_000.0, 0.15, 0.10),
    zone(1_000.0, 10_000.0, 0.10, 0.05),
    zone(10_000.0, 1_000_000.0, 0.05, 0.0),
];

/// `s_min + (s_max − s_min) · (ln x − ln x_min) / (ln x_max − ln x_min)`,
/// pinned to the end scores outside `[x_min, x_max]`.
pub fn log_interpolate(x: f64, x_min: f64, x_max: f64, s_min: f64, s_max: f64) -> f64 {
    if x <= x_min {
        return s_min;
    }
    if x >= x_max {
        return s_max;
    }
    if x_min <= 0.0 {
        return s_min;
    }
    let (ln_x, ln_min, ln_max) = (x.ln(), x_min.ln(), x_max.ln());
    s_min + (s_max - s_min) * (ln_x - ln_min) / (ln_max - ln_min)
}

fn score_in_zones(x: f64, zones: &[PnlZone]) -> Option<f64> {
    zones
        .iter()
        .find(|z| x >= z.lower && x < z.upper)
        .map(|z| log_interpolate(x, z.lower, z.upper, z.score_at_lower, z.score_at_upper))
}

/// Score signed total PnL (currency units) into [0, 1].
pub fn calculate_pnl_score(pnl: f64) -> f64 {
    if pnl.is_nan() {
        return BREAK_EVEN_SCORE;
    }

    let score = if pnl >= 0.0 {
        // Flat below $1: the first profit zone starts at break-even
        if pnl < 1.0 {
            BREAK_EVEN_SCORE
        } else if pnl >= PROFIT_CAP {
            1.0
        } else {
            score_in_zones(pnl, &PROFIT_ZONES).unwrap_or(1.0)
        }
    } else {
        let loss = pnl.abs();
        if loss < SMALL_LOSS_LIMIT {
            BREAK_EVEN_SCORE
        } else {
            score_in_zones(loss, &LOSS_ZONES).unwrap_or(0.0)
        }
    };

    score.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    #[test]
    fn test_pnl_profit_boundaries() {
        assert!(approx(calculate_pnl_score(100.0), 0.25, 0.01));
        assert!(approx(calculate_pnl_score(1_000.0), 0.40, 0.01));
        assert!(approx(calculate_pnl_score(5_000.0), 0.60, 1e-12));
        assert!(approx(calculate_pnl_score(10_000.0), 0.75, 0.01));
        assert!(approx(calculate_pnl_score(100_000.0), 0.92, 1e-12));
        assert_eq!(calculate_pnl_score(1_000_000.0), 1.0);
        assert_eq!(calculate_pnl_score(5e9), 1.0);
    }

    #[test]
    fn test_pnl_loss_boundaries() {
        assert!(approx(calculate_pnl_score(-100.0), 0.15, 0.01));
        assert!(approx(calculate_pnl_score(-1_000.0), 0.10, 0.01));
        assert!(approx(calculate_pnl_score(-10_000.0), 0.05, 0.01));
        assert!(approx(calculate_pnl_score(-100_000.0), 0.025, 1e-12));
        assert_eq!(calculate_pnl_score(-1_000_000.0), 0.0);
        assert_eq!(calculate_pnl_score(-1e12), 0.0);
    }

    #[test]
    fn test_pnl_inside_zone_is_logarithmic() {
        // One decade inside [1, 100) is half the band
        assert!(approx(calculate_pnl_score(10.0), 0.20, 1e-12));
        // Geometric mean of 100 and 1000 sits mid-band
        let mid = calculate_pnl_score(-(100.0f64 * 1000.0).sqrt());
        assert!(approx(mid, 0.125, 1e-12));
    }

    #[test]
    fn test_pnl_near_zero() {
        assert_eq!(calculate_pnl_score(0.0), BREAK_EVEN_SCORE);
        assert_eq!(calculate_pnl_score(0.5), BREAK_EVEN_SCORE);
        assert_eq!(calculate_pnl_score(-0.5), BREAK_EVEN_SCORE);
        assert_eq!(calculate_pnl_score(-99.0), BREAK_EVEN_SCORE);
        assert_eq!(calculate_pnl_score(f64::NAN), BREAK_EVEN_SCORE);
    }

    #[test]
    fn test_pnl_sub_dollar_profit_never_outscores_one_dollar() {
        let one_dollar = calculate_pnl_score(1.0);
        for cents in 0..100 {
            let pnl = f64::from(cents) / 100.0;
            assert_eq!(calculate_pnl_score(pnl), BREAK_EVEN_SCORE);
            assert!(calculate_pnl_score(pnl) <= one_dollar);
        }
    }

    #[test]
    fn test_pnl_monotonic_and_bounded() {
        let mut xs: Vec<f64> = Vec::new();
        let mut mag = 0.01;
        while mag < 1e8 {
            xs.push(mag);
            xs.push(-mag);
            mag *= 1.37;
        }
        xs.extend([0.0, 1.0, 100.0, 1000.0, 5000.0, 10000.0, -100.0, -1000.0, -10000.0]);
        xs.sort_by(|a, b| a.total_cmp(b));

        let mut prev = f64::NEG_INFINITY;
        for x in xs {
            let s = calculate_pnl_score(x);
            assert!((0.0..=1.0).contains(&s), "out of range at {}", x);
            assert!(s >= prev, "decreasing at {}: {} < {}", x, s, prev);
            prev = s;
        }
    }

    #[test]
    fn test_log_interpolate_pins_ends() {
        assert_eq!(log_interpolate(0.5, 1.0, 100.0, 0.1, 0.2), 0.1);
        assert_eq!(log_interpolate(200.0, 1.0, 100.0, 0.1, 0.2), 0.2);
        assert_eq!(log_interpolate(5.0, 0.0, 100.0, 0.1, 0.2), 0.1);
    }
}
