//! Win score: equal blend of count-based and stake-weighted win rate.

/// Share of stake that sat on winning trades; 0 when nothing was staked.
pub fn stake_win_rate(winning_stakes: f64, total_stakes: f64) -> f64 {
    if total_stakes <= 0.0 {
        return 0.0;
    }
    winning_stakes / total_stakes
}

/// `0.5 · win_rate_trade + 0.5 · win_rate_stake`, in [0, 1].
///
/// `win_rate_percent` is the count-based win rate in percent.
pub fn calculate_win_score(win_rate_percent: f64, winning_stakes: f64, total_stakes: f64) -> f64 {
    let by_trade = win_rate_percent / 100.0;
    let by_stake = stake_win_rate(winning_stakes, total_stakes);
    (0.5 * by_trade + 0.5 * by_stake).clamp(0.0, 1.0)
}
