//! Leaderboard sort views and rank assignment

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::types::ScoredTrader;

/// A leaderboard ordering over scored traders
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortView {
    FinalScore,
    ScoreWinRate,
    ScoreRoi,
    ScorePnl,
    ScoreRisk,
    RoiRaw,
    TotalPnl,
    WinRate,
    /// Legacy views, best = lowest
    WShrunk,
    RoiShrunk,
    PnlShrunk,
}

impl SortView {
    pub const ALL: [SortView; 11] = [
        SortView::FinalScore,
        SortView::ScoreWinRate,
        SortView::ScoreRoi,
        SortView::ScorePnl,
        SortView::ScoreRisk,
        SortView::RoiRaw,
        SortView::TotalPnl,
        SortView::WinRate,
        SortView::WShrunk,
        SortView::RoiShrunk,
        SortView::PnlShrunk,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::FinalScore => "final_score",
            Self::ScoreWinRate => "score_win_rate",
            Self::ScoreRoi => "score_roi",
            Self::ScorePnl => "score_pnl",
            Self::ScoreRisk => "score_risk",
            Self::RoiRaw => "roi_raw",
            Self::TotalPnl => "total_pnl",
            Self::WinRate => "win_rate",
            Self::WShrunk => "w_shrunk",
            Self::RoiShrunk => "roi_shrunk",
            Self::PnlShrunk => "pnl_shrunk",
        }
    }

    pub fn is_ascending(&self) -> bool {
        matches!(self, Self::WShrunk | Self::RoiShrunk | Self::PnlShrunk)
    }

    fn key(&self, t: &ScoredTrader) -> f64 {
        match self {
            Self::FinalScore => t.final_score,
            Self::ScoreWinRate => t.score_win_rate,
            Self::ScoreRoi => t.score_roi,
            Self::ScorePnl => t.score_pnl,
            Self::ScoreRisk => t.score_risk,
            Self::RoiRaw => t.metrics.roi,
            Self::TotalPnl => t.metrics.total_pnl,
            Self::WinRate => t.metrics.win_rate,
            Self::WShrunk => t.w_shrunk,
            Self::RoiShrunk => t.roi_shrunk,
            Self::PnlShrunk => t.pnl_shrunk,
        }
    }

    fn compare(&self, a: &ScoredTrader, b: &ScoredTrader) -> Ordering {
        let ord = self.key(a).total_cmp(&self.key(b));
        if self.is_ascending() {
            ord
        } else {
            ord.reverse()
        }
    }
}

impl fmt::Display for SortView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SortView {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|v| v.name() == wanted)
            .ok_or_else(|| format!("unknown sort view '{}'", s))
    }
}

/// Stable-sort `traders` for `view` and assign 1-based ranks.
///
/// Equal keys keep their input order.
pub fn rank_by(traders: &[ScoredTrader], view: SortView) -> Vec<ScoredTrader> {
    let mut sorted = traders.to_vec();
    sorted.sort_by(|a, b| view.compare(a, b));
    for (i, t) in sorted.iter_mut().enumerate() {
        t.rank = Some(i as u32 + 1);
    }
    sorted
}

/// Every view at once, keyed by view
pub fn build_all_views(traders: &[ScoredTrader]) -> BTreeMap<SortView, Vec<ScoredTrader>> {
    SortView::ALL
        .iter()
        .map(|view| (*view, rank_by(traders, *view)))
        .collect()
}
