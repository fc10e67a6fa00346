//! Leaderboard repository - latest scored entries and refresh metadata

use crate::DbResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteConnection, SqlitePool};

/// One scored wallet as persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct LeaderboardEntryRecord {
    pub id: Option<i64>,
    pub wallet_address: String,
    pub name: Option<String>,
    pub total_trades: i64,
    pub total_trades_with_pnl: i64,
    pub winning_trades: i64,
    pub total_pnl: f64,
    pub roi: f64,
    pub win_rate: f64,
    pub total_stakes: f64,
    pub winning_stakes: f64,
    pub max_stake: f64,
    pub sum_sq_stakes: f64,
    pub worst_loss: f64,
    pub all_losses_json: String,
    pub score_win_rate: f64,
    pub score_roi: f64,
    pub score_pnl: f64,
    pub score_risk: f64,
    pub risk_status: String,
    pub confidence_score: f64,
    pub confidence_level: String,
    pub final_score: f64,
    pub w_shrunk: f64,
    pub roi_shrunk: f64,
    pub pnl_shrunk: f64,
    pub effective_trade_mass: f64,
    pub pnl_adjusted: f64,
    pub calculated_at: Option<i64>,
}

/// Summary of one refresh run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct LeaderboardMetadataRecord {
    pub id: Option<i64>,
    pub total_traders: i64,
    pub population_size: i64,
    pub excluded_traders: i64,
    pub failed_wallets: i64,
    pub roi_median: f64,
    pub pnl_median: f64,
    pub anchors_json: Option<String>,
    pub config_json: Option<String>,
    pub calculated_at: Option<i64>,
}

impl LeaderboardMetadataRecord {
    /// `calculated_at` as a UTC timestamp
    pub fn calculated_at_utc(&self) -> Option<DateTime<Utc>> {
        self.calculated_at
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
    }
}

/// Repository for the persisted leaderboard
pub struct LeaderboardRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> LeaderboardRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Upsert entries by wallet in a single transaction.
    /// Returns the number of rows written.
    pub async fn save_entries(&self, entries: &[LeaderboardEntryRecord]) -> DbResult<usize> {
        let mut tx = self.pool.begin().await?;
        let written = upsert_entries(&mut tx, entries).await?;
        tx.commit().await?;
        Ok(written)
    }

    /// All entries, best final score first
    pub async fn get_all_entries(&self) -> DbResult<Vec<LeaderboardEntryRecord>> {
        let records = sqlx::query_as::<_, LeaderboardEntryRecord>(
            "SELECT * FROM leaderboard_entries ORDER BY final_score DESC, id ASC",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(records)
    }

    pub async fn count_entries(&self) -> DbResult<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM leaderboard_entries")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }

    /// Drop entries whose wallet is not in `keep`. Returns rows deleted.
    pub async fn delete_missing(&self, keep: &[String]) -> DbResult<u64> {
        let mut conn = self.pool.acquire().await?;
        delete_entries_not_in(&mut conn, keep).await
    }

    pub async fn save_metadata(&self, record: &LeaderboardMetadataRecord) -> DbResult<i64> {
        let mut conn = self.pool.acquire().await?;
        insert_metadata(&mut conn, record).await
    }

    /// Replace the stored leaderboard with one refresh run, atomically.
    ///
    /// Upserts `entries`, deletes every entry whose wallet is not in `keep`
    /// and appends `metadata`. Either all three steps land or none do.
    pub async fn replace_leaderboard(
        &self,
        entries: &[LeaderboardEntryRecord],
        keep: &[String],
        metadata: &LeaderboardMetadataRecord,
    ) -> DbResult<(usize, u64)> {
        let mut tx = self.pool.begin().await?;
        let saved = upsert_entries(&mut tx, entries).await?;
        let removed = delete_entries_not_in(&mut tx, keep).await?;
        insert_metadata(&mut tx, metadata).await?;
        tx.commit().await?;
        Ok((saved, removed))
    }

    /// Most recent refresh run, if any
    pub async fn get_latest_metadata(&self) -> DbResult<Option<LeaderboardMetadataRecord>> {
        let record = sqlx::query_as::<_, LeaderboardMetadataRecord>(
            "SELECT * FROM leaderboard_metadata ORDER BY id DESC LIMIT 1",
        )
        .fetch_optional(self.pool)
        .await?;

        Ok(record)
    }
}

// ---------------------------------------------------------------------------
// Statements shared by pooled and transactional callers
// ---------------------------------------------------------------------------

async fn upsert_entries(
    conn: &mut SqliteConnection,
    entries: &[LeaderboardEntryRecord],
) -> DbResult<usize> {
    let mut written = 0usize;
    for e in entries {
        let result = sqlx::query(
            r#"INSERT INTO leaderboard_entries
                (wallet_address, name, total_trades, total_trades_with_pnl, winning_trades,
                 total_pnl, roi, win_rate, total_stakes, winning_stakes, max_stake,
                 sum_sq_stakes, worst_loss, all_losses_json, score_win_rate, score_roi,
                 score_pnl, score_risk, risk_status, confidence_score, confidence_level,
                 final_score, w_shrunk, roi_shrunk, pnl_shrunk, effective_trade_mass,
                 pnl_adjusted, calculated_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
                       ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27,
                       strftime('%s', 'now'))
               ON CONFLICT(wallet_address) DO UPDATE SET
                 name = excluded.name,
                 total_trades = excluded.total_trades,
                 total_trades_with_pnl = excluded.total_trades_with_pnl,
                 winning_trades = excluded.winning_trades,
                 total_pnl = excluded.total_pnl,
                 roi = excluded.roi,
                 win_rate = excluded.win_rate,
                 total_stakes = excluded.total_stakes,
                 winning_stakes = excluded.winning_stakes,
                 max_stake = excluded.max_stake,
                 sum_sq_stakes = excluded.sum_sq_stakes,
                 worst_loss = excluded.worst_loss,
                 all_losses_json = excluded.all_losses_json,
                 score_win_rate = excluded.score_win_rate,
                 score_roi = excluded.score_roi,
                 score_pnl = excluded.score_pnl,
                 score_risk = excluded.score_risk,
                 risk_status = excluded.risk_status,
                 confidence_score = excluded.confidence_score,
                 confidence_level = excluded.confidence_level,
                 final_score = excluded.final_score,
                 w_shrunk = excluded.w_shrunk,
                 roi_shrunk = excluded.roi_shrunk,
                 pnl_shrunk = excluded.pnl_shrunk,
                 effective_trade_mass = excluded.effective_trade_mass,
                 pnl_adjusted = excluded.pnl_adjusted,
                 calculated_at = strftime('%s', 'now')
            "#,
        )
        .bind(&e.wallet_address)
        .bind(&e.name)
        .bind(e.total_trades)
        .bind(e.total_trades_with_pnl)
        .bind(e.winning_trades)
        .bind(e.total_pnl)
        .bind(e.roi)
        .bind(e.win_rate)
        .bind(e.total_stakes)
        .bind(e.winning_stakes)
        .bind(e.max_stake)
        .bind(e.sum_sq_stakes)
        .bind(e.worst_loss)
        .bind(&e.all_losses_json)
        .bind(e.score_win_rate)
        .bind(e.score_roi)
        .bind(e.score_pnl)
        .bind(e.score_risk)
        .bind(&e.risk_status)
        .bind(e.confidence_score)
        .bind(&e.confidence_level)
        .bind(e.final_score)
        .bind(e.w_shrunk)
        .bind(e.roi_shrunk)
        .bind(e.pnl_shrunk)
        .bind(e.effective_trade_mass)
        .bind(e.pnl_adjusted)
        .execute(&mut *conn)
        .await?;
        written += result.rows_affected() as usize;
    }
    Ok(written)
}

async fn delete_entries_not_in(conn: &mut SqliteConnection, keep: &[String]) -> DbResult<u64> {
    if keep.is_empty() {
        let result = sqlx::query("DELETE FROM leaderboard_entries")
            .execute(&mut *conn)
            .await?;
        return Ok(result.rows_affected());
    }

    let placeholders = (1..=keep.len())
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "DELETE FROM leaderboard_entries WHERE wallet_address NOT IN ({})",
        placeholders
    );
    let mut query = sqlx::query(&sql);
    for wallet in keep {
        query = query.bind(wallet);
    }
    let result = query.execute(&mut *conn).await?;
    Ok(result.rows_affected())
}

async fn insert_metadata(
    conn: &mut SqliteConnection,
    record: &LeaderboardMetadataRecord,
) -> DbResult<i64> {
    let result = sqlx::query(
        r#"INSERT INTO leaderboard_metadata
            (total_traders, population_size, excluded_traders, failed_wallets,
             roi_median, pnl_median, anchors_json, config_json, calculated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, strftime('%s', 'now'))
        "#,
    )
    .bind(record.total_traders)
    .bind(record.population_size)
    .bind(record.excluded_traders)
    .bind(record.failed_wallets)
    .bind(record.roi_median)
    .bind(record.pnl_median)
    .bind(&record.anchors_json)
    .bind(&record.config_json)
    .execute(&mut *conn)
    .await?;

    Ok(result.last_insert_rowid())
}
