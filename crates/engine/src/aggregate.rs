//! Closed positions -> RawTraderMetrics
//!
//! A position's stake is `totalBought × avgPrice`; it is a win when its
//! realized P&L is strictly positive.

use serde::{Deserialize, Serialize};

use crate::api::polymarket::ClosedPosition;
use crate::types::RawTraderMetrics;

/// How `max_stake` is derived from the individual stakes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxStakeMode {
    /// Single largest stake
    #[default]
    Largest,
    /// Mean of the five largest stakes
    TopFiveMean,
}

fn stake_of(position: &ClosedPosition) -> f64 {
    let stake = position.total_bought.unwrap_or(0.0) * position.avg_price.unwrap_or(0.0);
    if stake.is_finite() && stake > 0.0 {
        stake
    } else {
        0.0
    }
}

fn max_stake(stakes: &[f64], mode: MaxStakeMode) -> f64 {
    let mut sorted = stakes.to_vec();
    sorted.sort_by(|a, b| b.total_cmp(a));
    match mode {
        MaxStakeMode::Largest => sorted.first().copied().unwrap_or(0.0),
        MaxStakeMode::TopFiveMean => {
            let top = &sorted[..sorted.len().min(5)];
            if top.is_empty() {
                0.0
            } else {
                top.iter().sum::<f64>() / top.len() as f64
            }
        }
    }
}

/// Fold a wallet's closed positions into the scoring input.
pub fn aggregate_closed_positions(
    wallet: &str,
    positions: &[ClosedPosition],
    mode: MaxStakeMode,
) -> RawTraderMetrics {
    let mut stakes = Vec::with_capacity(positions.len());
    let mut all_losses = Vec::new();
    let mut total_pnl = 0.0;
    let mut winning_trades = 0u32;
    let mut trades_with_pnl = 0u32;
    let mut winning_stakes = 0.0;

    for position in positions {
        let stake = stake_of(position);
        stakes.push(stake);

        let Some(pnl) = position.realized_pnl.filter(|p| p.is_finite()) else {
            continue;
        };
        trades_with_pnl += 1;
        total_pnl += pnl;
        if pnl > 0.0 {
            winning_trades += 1;
            winning_stakes += stake;
        } else if pnl < 0.0 {
            all_losses.push(pnl);
        }
    }

    let total_trades = positions.len() as u32;
    let total_stakes: f64 = stakes.iter().sum();
    let sum_sq_stakes: f64 = stakes.iter().map(|s| s * s).sum();
    let worst_loss = all_losses.iter().copied().fold(0.0, f64::min);

    let roi = if total_stakes > 0.0 {
        total_pnl / total_stakes * 100.0
    } else {
        0.0
    };
    let win_rate = if total_trades > 0 {
        f64::from(winning_trades) / f64::from(total_trades) * 100.0
    } else {
        0.0
    };

    RawTraderMetrics {
        wallet_address: wallet.to_string(),
        name: None,
        total_trades,
        total_trades_with_pnl: trades_with_pnl,
        winning_trades,
        total_pnl,
        roi,
        win_rate,
        total_stakes,
        winning_stakes,
        max_stake: max_stake(&stakes, mode),
        sum_sq_stakes,
        worst_loss,
        all_losses,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(bought: f64, price: f64, pnl: f64) -> ClosedPosition {
        ClosedPosition {
            total_bought: Some(bought),
            avg_price: Some(price),
            realized_pnl: Some(pnl),
            ..Default::default()
        }
    }

    #[test]
    fn test_aggregate_basic() {
        let positions = vec![
            position(1000.0, 0.5, 200.0),  // stake 500, win
            position(400.0, 0.5, -150.0),  // stake 200, loss
            position(600.0, 0.5, -50.0),   // stake 300, loss
        ];
        let m = aggregate_closed_positions("0xabc", &positions, MaxStakeMode::Largest);

        assert_eq!(m.wallet_address, "0xabc");
        assert_eq!(m.total_trades, 3);
        assert_eq!(m.total_trades_with_pnl, 3);
        assert_eq!(m.winning_trades, 1);
        assert!((m.total_pnl - 0.0).abs() < 1e-9);
        assert!((m.total_stakes - 1000.0).abs() < 1e-9);
        assert!((m.winning_stakes - 500.0).abs() < 1e-9);
        assert!((m.win_rate - 100.0 / 3.0).abs() < 1e-9);
        assert_eq!(m.max_stake, 500.0);
        assert!((m.sum_sq_stakes - 380_000.0).abs() < 1e-6);
        assert_eq!(m.worst_loss, -150.0);
        assert_eq!(m.all_losses, vec![-150.0, -50.0]);
    }

    #[test]
    fn test_aggregate_roi_percent() {
        let positions = vec![position(2000.0, 0.5, 100.0)];
        let m = aggregate_closed_positions("0xabc", &positions, MaxStakeMode::Largest);
        // 100 / 1000 stake
        assert!((m.roi - 10.0).abs() < 1e-9);
        assert_eq!(m.worst_loss, 0.0);
        assert!(m.all_losses.is_empty());
    }

    #[test]
    fn test_aggregate_top_five_mean() {
        let positions: Vec<_> = [10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0]
            .iter()
            .map(|s| position(*s, 1.0, 1.0))
            .collect();
        let m = aggregate_closed_positions("0xabc", &positions, MaxStakeMode::TopFiveMean);
        assert!((m.max_stake - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_aggregate_missing_pnl() {
        let mut open = position(100.0, 0.5, 0.0);
        open.realized_pnl = None;
        let m = aggregate_closed_positions("0xabc", &[open], MaxStakeMode::Largest);
        assert_eq!(m.total_trades, 1);
        assert_eq!(m.total_trades_with_pnl, 0);
        assert!((m.total_stakes - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_aggregate_empty() {
        let m = aggregate_closed_positions("0xabc", &[], MaxStakeMode::TopFiveMean);
        assert_eq!(m.total_trades, 0);
        assert_eq!(m.roi, 0.0);
        assert_eq!(m.win_rate, 0.0);
        assert_eq!(m.max_stake, 0.0);
    }

    #[test]
    fn test_max_stake_mode_serde() {
        let mode: MaxStakeMode = serde_json::from_str("\"top_five_mean\"").unwrap();
        assert_eq!(mode, MaxStakeMode::TopFiveMean);
    }
}
