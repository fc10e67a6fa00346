use engine::{
    build_all_views, rank_by, score_population, RawTraderMetrics, ScoringConfig, SortView,
};

fn trader(
    wallet: &str,
    trades: u32,
    win_rate: f64,
    roi: f64,
    pnl: f64,
    stakes: f64,
    worst_loss: f64,
) -> RawTraderMetrics {
    RawTraderMetrics {
        wallet_address: wallet.into(),
        total_trades: trades,
        total_trades_with_pnl: trades,
        winning_trades: (f64::from(trades) * win_rate / 100.0).round() as u32,
        total_pnl: pnl,
        roi,
        win_rate,
        total_stakes: stakes,
        winning_stakes: stakes * win_rate / 100.0,
        max_stake: stakes / f64::from(trades.max(1)),
        sum_sq_stakes: stakes * stakes / f64::from(trades.max(1)),
        worst_loss,
        all_losses: vec![worst_loss],
        ..Default::default()
    }
}

fn batch() -> Vec<RawTraderMetrics> {
    vec![
        trader("0xsteady", 200, 58.0, 12.0, 24_000.0, 200_000.0, -2_000.0),
        trader("0xlucky", 3, 100.0, 300.0, 9_000.0, 3_000.0, 0.0),
        trader("0xloser", 80, 35.0, -40.0, -16_000.0, 40_000.0, -6_000.0),
        trader("0xnewbie", 0, 0.0, 0.0, 0.0, 0.0, 0.0),
        trader("0xmid", 40, 50.0, 2.0, 300.0, 15_000.0, -900.0),
    ]
}

#[test]
fn test_pipeline_scores_every_trader_within_bounds() {
    let outcome = score_population(&batch(), &ScoringConfig::default()).unwrap();

    assert_eq!(outcome.traders.len(), 5);
    assert_eq!(outcome.summary.total_traders, 5);
    assert_eq!(outcome.summary.population_size, 3);

    for t in &outcome.traders {
        for s in [t.score_win_rate, t.score_roi, t.score_pnl, t.score_risk, t.confidence_score] {
            assert!((0.0..=1.0).contains(&s), "{} out of range", t.metrics.wallet_address);
        }
        assert!((0.0..=100.0).contains(&t.final_score));
    }

    let newbie = outcome
        .traders
        .iter()
        .find(|t| t.metrics.wallet_address == "0xnewbie")
        .unwrap();
    assert_eq!(newbie.final_score, 0.0);
}

#[test]
fn test_confidence_outweighs_a_lucky_streak() {
    let outcome = score_population(&batch(), &ScoringConfig::default()).unwrap();
    let ranked = rank_by(&outcome.traders, SortView::FinalScore);

    assert_eq!(ranked[0].metrics.wallet_address, "0xsteady");
    assert_eq!(ranked[0].rank, Some(1));
    assert_eq!(ranked.last().map(|t| t.metrics.wallet_address.as_str()), Some("0xnewbie"));

    let by_roi = rank_by(&outcome.traders, SortView::RoiRaw);
    assert_eq!(by_roi[0].metrics.wallet_address, "0xlucky");
}

#[test]
fn test_every_view_ranks_all_traders() {
    let outcome = score_population(&batch(), &ScoringConfig::default()).unwrap();
    let views = build_all_views(&outcome.traders);

    for (view, ranked) in &views {
        assert_eq!(ranked.len(), 5, "view {}", view);
        let ranks: Vec<u32> = ranked.iter().filter_map(|t| t.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4, 5], "view {}", view);
    }

    let w_shrunk = &views[&SortView::WShrunk];
    assert_eq!(w_shrunk[0].metrics.wallet_address, "0xnewbie");
}

#[test]
fn test_partial_json_input_scores() {
    let input = r#"[
        { "wallet": "0xa", "total_trades": 12, "total_trades_with_pnl": 12, "win_rate": 50.0,
          "roi": 5.0, "total_pnl": 250.0, "total_stakes": 5000.0, "winning_stakes": 2600.0,
          "worst_loss": -300.0 },
        { "wallet_address": "0xb", "total_trades": 1 }
    ]"#;
    let traders: Vec<RawTraderMetrics> = serde_json::from_str(input).unwrap();
    let outcome = score_population(&traders, &ScoringConfig::default()).unwrap();
    assert_eq!(outcome.traders.len(), 2);
    assert!(outcome.traders[0].final_score > outcome.traders[1].final_score);
}
