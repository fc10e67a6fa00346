//! Leaderboard refresh - fetch closed positions per wallet, score, persist
//!
//! Wallets are fetched one at a time with a fixed delay between calls. The
//! scored batch replaces the stored leaderboard and a metadata row records
//! the population figures of the run.

use crate::aggregate::{aggregate_closed_positions, MaxStakeMode};
use crate::api::polymarket::{ClosedPosition, PolymarketDataClient};
use crate::config::ScoringConfig;
use crate::population::score_population;
use crate::types::{
    PopulationSummary, RawTraderMetrics, RiskStatus, ScoredTrader, ScoringOutcome,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use persistence::repository::leaderboard::{
    LeaderboardEntryRecord, LeaderboardMetadataRecord, LeaderboardRepository,
};
use persistence::SqlitePool;
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::RwLock;
use std::time::Duration;
use tracing::{error, info, warn};

/// Environment variable naming the wallet list file
pub const WALLETS_FILE_ENV: &str = "POLY_RANK_WALLETS_FILE";

pub const DEFAULT_WALLETS_FILE: &str = "wallet_address.txt";

// ---------------------------------------------------------------------------
// Source of closed positions
// ---------------------------------------------------------------------------

#[async_trait]
pub trait ClosedPositionSource: Send + Sync {
    async fn closed_positions(&self, wallet: &str) -> Result<Vec<ClosedPosition>>;
}

#[async_trait]
impl ClosedPositionSource for PolymarketDataClient {
    async fn closed_positions(&self, wallet: &str) -> Result<Vec<ClosedPosition>> {
        self.get_closed_positions(wallet).await
    }
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshStatus {
    Idle,
    FetchingPositions,
    Scoring,
    Saving,
    Complete,
    Cancelled,
    Error,
}

pub struct RefreshProgress {
    pub status: RwLock<RefreshStatus>,
    pub total_wallets: AtomicU32,
    pub fetched: AtomicU32,
    pub failed: AtomicU32,
    pub current_wallet: RwLock<String>,
    pub summary: RwLock<Option<PopulationSummary>>,
    pub error_message: RwLock<Option<String>>,
    pub cancelled: AtomicBool,
}

/// Point-in-time copy of [`RefreshProgress`] for status endpoints
#[derive(Debug, Clone, Serialize)]
pub struct RefreshSnapshot {
    pub status: RefreshStatus,
    pub total_wallets: u32,
    pub fetched: u32,
    pub failed: u32,
    pub current_wallet: String,
    pub summary: Option<PopulationSummary>,
    pub error_message: Option<String>,
}

impl RefreshProgress {
    pub fn new() -> Self {
        Self {
            status: RwLock::new(RefreshStatus::Idle),
            total_wallets: AtomicU32::new(0),
            fetched: AtomicU32::new(0),
            failed: AtomicU32::new(0),
            current_wallet: RwLock::new(String::new()),
            summary: RwLock::new(None),
            error_message: RwLock::new(None),
            cancelled: AtomicBool::new(false),
        }
    }

    pub fn reset(&self) {
        *self.status.write().unwrap() = RefreshStatus::FetchingPositions;
        self.clear_counters();
    }

    fn clear_counters(&self) {
        self.total_wallets.store(0, Ordering::Relaxed);
        self.fetched.store(0, Ordering::Relaxed);
        self.failed.store(0, Ordering::Relaxed);
        *self.current_wallet.write().unwrap() = String::new();
        *self.summary.write().unwrap() = None;
        *self.error_message.write().unwrap() = None;
        self.cancelled.store(false, Ordering::Relaxed);
    }

    /// Claim the progress for a new run; false if one is already running.
    ///
    /// Check and claim happen under the status write lock, so concurrent
    /// callers cannot both start.
    pub fn try_start(&self) -> bool {
        let mut status = self.status.write().unwrap();
        if matches!(
            *status,
            RefreshStatus::FetchingPositions | RefreshStatus::Scoring | RefreshStatus::Saving
        ) {
            return false;
        }
        self.clear_counters();
        *status = RefreshStatus::FetchingPositions;
        true
    }

    pub fn is_running(&self) -> bool {
        let status = self.status.read().unwrap();
        matches!(
            *status,
            RefreshStatus::FetchingPositions | RefreshStatus::Scoring | RefreshStatus::Saving
        )
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> RefreshSnapshot {
        RefreshSnapshot {
            status: *self.status.read().unwrap(),
            total_wallets: self.total_wallets.load(Ordering::Relaxed),
            fetched: self.fetched.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            current_wallet: self.current_wallet.read().unwrap().clone(),
            summary: self.summary.read().unwrap().clone(),
            error_message: self.error_message.read().unwrap().clone(),
        }
    }

    fn fail(&self, message: String) {
        error!("{}", message);
        *self.status.write().unwrap() = RefreshStatus::Error;
        *self.error_message.write().unwrap() = Some(message);
    }
}

impl Default for RefreshProgress {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Wallet list
// ---------------------------------------------------------------------------

/// One wallet per line; blank lines and `#` comments are skipped and
/// duplicates (case-insensitive) keep their first occurrence.
pub fn parse_wallet_list(contents: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    contents
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .filter(|l| seen.insert(l.to_lowercase()))
        .map(str::to_string)
        .collect()
}

pub fn load_wallets(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read wallet list {}", path.display()))?;
    Ok(parse_wallet_list(&contents))
}

/// Wallets of the top `limit` traders on the public Polymarket leaderboard
pub async fn wallets_from_leaderboard(
    client: &PolymarketDataClient,
    limit: u32,
) -> Result<Vec<String>> {
    let entries = client.get_leaderboard(limit).await?;
    let listing: String = entries
        .iter()
        .filter_map(|e| e.proxy_wallet.as_deref())
        .collect::<Vec<_>>()
        .join("\n");
    Ok(parse_wallet_list(&listing))
}

// ---------------------------------------------------------------------------
// Record conversion
// ---------------------------------------------------------------------------

fn risk_status_name(status: RiskStatus) -> &'static str {
    match status {
        RiskStatus::Scored => "scored",
        RiskStatus::InsufficientData => "insufficient_data",
    }
}

/// Convert a scored trader into a DB record
pub fn scored_to_record(t: &ScoredTrader) -> LeaderboardEntryRecord {
    let m = &t.metrics;
    LeaderboardEntryRecord {
        id: None,
        wallet_address: m.wallet_address.clone(),
        name: m.name.clone(),
        total_trades: i64::from(m.total_trades),
        total_trades_with_pnl: i64::from(m.total_trades_with_pnl),
        winning_trades: i64::from(m.winning_trades),
        total_pnl: m.total_pnl,
        roi: m.roi,
        win_rate: m.win_rate,
        total_stakes: m.total_stakes,
        winning_stakes: m.winning_stakes,
        max_stake: m.max_stake,
        sum_sq_stakes: m.sum_sq_stakes,
        worst_loss: m.worst_loss,
        all_losses_json: serde_json::to_string(&m.all_losses).unwrap_or_else(|_| "[]".into()),
        score_win_rate: t.score_win_rate,
        score_roi: t.score_roi,
        score_pnl: t.score_pnl,
        score_risk: t.score_risk,
        risk_status: risk_status_name(t.risk_status).to_string(),
        confidence_score: t.confidence_score,
        confidence_level: t.confidence_level.clone(),
        final_score: t.final_score,
        w_shrunk: t.w_shrunk,
        roi_shrunk: t.roi_shrunk,
        pnl_shrunk: t.pnl_shrunk,
        effective_trade_mass: t.effective_trade_mass,
        pnl_adjusted: t.pnl_adjusted,
        calculated_at: None,
    }
}

/// Rebuild a scored trader from a stored record (rank unset)
pub fn record_to_scored(r: &LeaderboardEntryRecord) -> ScoredTrader {
    let count = |v: i64| u32::try_from(v.max(0)).unwrap_or(u32::MAX);
    ScoredTrader {
        metrics: RawTraderMetrics {
            wallet_address: r.wallet_address.clone(),
            name: r.name.clone(),
            total_trades: count(r.total_trades),
            total_trades_with_pnl: count(r.total_trades_with_pnl),
            winning_trades: count(r.winning_trades),
            total_pnl: r.total_pnl,
            roi: r.roi,
            win_rate: r.win_rate,
            total_stakes: r.total_stakes,
            winning_stakes: r.winning_stakes,
            max_stake: r.max_stake,
            sum_sq_stakes: r.sum_sq_stakes,
            worst_loss: r.worst_loss,
            all_losses: serde_json::from_str(&r.all_losses_json).unwrap_or_default(),
        },
        score_win_rate: r.score_win_rate,
        score_roi: r.score_roi,
        score_pnl: r.score_pnl,
        score_risk: r.score_risk,
        risk_status: match r.risk_status.as_str() {
            "insufficient_data" => RiskStatus::InsufficientData,
            _ => RiskStatus::Scored,
        },
        confidence_score: r.confidence_score,
        confidence_level: r.confidence_level.clone(),
        final_score: r.final_score,
        w_shrunk: r.w_shrunk,
        roi_shrunk: r.roi_shrunk,
        pnl_shrunk: r.pnl_shrunk,
        effective_trade_mass: r.effective_trade_mass,
        pnl_adjusted: r.pnl_adjusted,
        rank: None,
    }
}

/// Metadata row for one refresh run
pub fn summary_to_metadata(
    summary: &PopulationSummary,
    failed_wallets: u32,
    config: &ScoringConfig,
) -> LeaderboardMetadataRecord {
    let to_i64 = |n: usize| i64::try_from(n).unwrap_or(i64::MAX);
    LeaderboardMetadataRecord {
        id: None,
        total_traders: to_i64(summary.total_traders),
        population_size: to_i64(summary.population_size),
        excluded_traders: to_i64(summary.excluded_traders),
        failed_wallets: i64::from(failed_wallets),
        roi_median: summary.roi_median,
        pnl_median: summary.pnl_median,
        anchors_json: serde_json::to_string(&summary.anchors).ok(),
        config_json: serde_json::to_string(config).ok(),
        calculated_at: None,
    }
}

/// Load every stored entry as scored traders, best final score first
pub async fn load_stored_leaderboard(pool: &SqlitePool) -> Result<Vec<ScoredTrader>> {
    let repo = LeaderboardRepository::new(pool);
    let records = repo.get_all_entries().await?;
    Ok(records.iter().map(record_to_scored).collect())
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct RefreshOptions {
    pub max_stake_mode: MaxStakeMode,
    /// Pause between wallet fetches
    pub request_delay: Duration,
}

impl Default for RefreshOptions {
    fn default() -> Self {
        Self {
            max_stake_mode: MaxStakeMode::Largest,
            request_delay: Duration::from_millis(200),
        }
    }
}

async fn persist_outcome(
    pool: &SqlitePool,
    outcome: &ScoringOutcome,
    failed_wallets: &[String],
    config: &ScoringConfig,
) -> Result<()> {
    let repo = LeaderboardRepository::new(pool);

    let records: Vec<LeaderboardEntryRecord> =
        outcome.traders.iter().map(scored_to_record).collect();

    // Wallets that failed to fetch keep their last stored score
    let keep: Vec<String> = records
        .iter()
        .map(|r| r.wallet_address.clone())
        .chain(failed_wallets.iter().cloned())
        .collect();

    let metadata = summary_to_metadata(&outcome.summary, failed_wallets.len() as u32, config);
    let (saved, removed) = repo.replace_leaderboard(&records, &keep, &metadata).await?;

    info!(saved, removed, kept_failed = failed_wallets.len(), "Leaderboard persisted");
    Ok(())
}

/// Fetch, score and (optionally) persist a wallet set.
///
/// Wallets whose fetch fails are skipped and counted in `progress.failed`.
/// Nothing is written when the run is cancelled or when every fetch failed.
pub async fn run_leaderboard_refresh(
    source: &dyn ClosedPositionSource,
    progress: &RefreshProgress,
    wallets: &[String],
    config: &ScoringConfig,
    options: RefreshOptions,
    db_pool: Option<SqlitePool>,
) -> Result<ScoringOutcome> {
    if let Err(e) = config.validate() {
        progress.fail(format!("Invalid scoring config: {}", e));
        return Err(e.into());
    }

    let count = wallets.len() as u32;
    info!(count, "Starting leaderboard refresh");
    *progress.status.write().unwrap() = RefreshStatus::FetchingPositions;
    progress.total_wallets.store(count, Ordering::Relaxed);

    // Step 1: fetch and aggregate each wallet
    let mut metrics = Vec::with_capacity(wallets.len());
    let mut failed_wallets = Vec::new();
    for (i, wallet) in wallets.iter().enumerate() {
        if progress.cancelled.load(Ordering::Relaxed) {
            warn!("Leaderboard refresh cancelled");
            *progress.status.write().unwrap() = RefreshStatus::Cancelled;
            anyhow::bail!("Leaderboard refresh cancelled");
        }

        *progress.current_wallet.write().unwrap() = wallet.clone();

        match source.closed_positions(wallet).await {
            Ok(positions) => {
                metrics.push(aggregate_closed_positions(
                    wallet,
                    &positions,
                    options.max_stake_mode,
                ));
            }
            Err(e) => {
                warn!(wallet = %wallet, error = %e, "Failed to fetch closed positions");
                progress.failed.fetch_add(1, Ordering::Relaxed);
                failed_wallets.push(wallet.clone());
            }
        }
        progress.fetched.fetch_add(1, Ordering::Relaxed);

        // Rate limit between wallets
        if i + 1 < wallets.len() && !options.request_delay.is_zero() {
            tokio::time::sleep(options.request_delay).await;
        }
    }

    if !wallets.is_empty() && metrics.is_empty() {
        let message = format!(
            "All {} wallet fetches failed, stored leaderboard kept",
            wallets.len()
        );
        progress.fail(message.clone());
        anyhow::bail!(message);
    }

    // Step 2: score
    *progress.status.write().unwrap() = RefreshStatus::Scoring;
    let outcome = match score_population(&metrics, config) {
        Ok(o) => o,
        Err(e) => {
            progress.fail(format!("Scoring failed: {}", e));
            return Err(e.into());
        }
    };
    *progress.summary.write().unwrap() = Some(outcome.summary.clone());

    // Step 3: persist
    if let Some(ref pool) = db_pool {
        *progress.status.write().unwrap() = RefreshStatus::Saving;
        if let Err(e) = persist_outcome(pool, &outcome, &failed_wallets, config).await {
            progress.fail(format!("Failed to save leaderboard: {}", e));
            return Err(e);
        }
    }

    *progress.status.write().unwrap() = RefreshStatus::Complete;
    info!(
        scored = outcome.traders.len(),
        failed = progress.failed.load(Ordering::Relaxed),
        "Leaderboard refresh complete"
    );
    Ok(outcome)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
