//! Population statistics: exact median, interpolated percentile,
//! effective trade mass and the legacy shrinkage helper.

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut v = values.to_vec();
    v.sort_by(|a, b| a.total_cmp(b));
    v
}

/// Traditional median.
///
/// Odd `n`: the ((n+1)/2)-th term. Even `n`: mean of the (n/2)-th and
/// (n/2+1)-th terms. Empty input gives 0.0.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let v = sorted(values);
    let n = v.len();
    if n % 2 == 1 {
        v[n / 2]
    } else {
        (v[n / 2 - 1] + v[n / 2]) / 2.0
    }
}

/// Linear-interpolated percentile with rank `k = (n-1)·p/100`.
///
/// `p` is clamped to [0, 100]. Empty input gives 0.0.
pub fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let v = sorted(values);
    let p = p.clamp(0.0, 100.0);
    let k = (v.len() - 1) as f64 * p / 100.0;
    let f = k.floor();
    let c = k.ceil();
    if f == c {
        return v[k as usize];
    }
    let lo = v[f as usize];
    let hi = v[c as usize];
    lo * (c - k) + hi * (k - f)
}

/// Effective trade mass (Hill estimator): `N_eff = (Σs)² / Σs²`.
///
/// Equal stakes give `n`; one dominant stake collapses toward 1.
pub fn effective_trade_mass(stakes: &[f64]) -> f64 {
    if stakes.is_empty() {
        return 0.0;
    }
    let sum: f64 = stakes.iter().sum();
    let sum_sq: f64 = stakes.iter().map(|s| s * s).sum();
    effective_trade_mass_from_sums(sum, sum_sq)
}

/// Same as [`effective_trade_mass`] from pre-aggregated Σs and Σs².
pub fn effective_trade_mass_from_sums(sum_stakes: f64, sum_sq_stakes: f64) -> f64 {
    if sum_sq_stakes <= 0.0 {
        return 0.0;
    }
    sum_stakes * sum_stakes / sum_sq_stakes
}

/// Pull `value` toward `baseline` with reliability weight `n_eff` against
/// prior strength `k`.
pub fn shrink_toward(value: f64, baseline: f64, n_eff: f64, k: f64) -> f64 {
    let denom = n_eff + k;
    if denom <= 0.0 {
        return baseline;
    }
    (value * n_eff + baseline * k) / denom
}

/// `PnL / (1 + α·(max_stake / total_stakes))`; the ratio is 0 when there is no stake.
pub fn whale_adjusted_pnl(total_pnl: f64, max_stake: f64, total_stakes: f64, alpha: f64) -> f64 {
    let ratio = if total_stakes > 0.0 {
        max_stake / total_stakes
    } else {
        0.0
    };
    let denom = 1.0 + alpha * ratio;
    if denom <= 0.0 {
        return total_pnl;
    }
    total_pnl / denom
}
