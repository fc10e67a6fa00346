//! Database schema definitions

/// SQL to create all tables
/// NOTE: scores and amounts are stored as REAL; scoring is f64 end to end
pub const CREATE_TABLES: &str = r#"
-- Latest scored snapshot, one row per wallet
CREATE TABLE IF NOT EXISTS leaderboard_entries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    wallet_address TEXT NOT NULL UNIQUE,
    name TEXT,
    total_trades INTEGER NOT NULL DEFAULT 0,
    total_trades_with_pnl INTEGER NOT NULL DEFAULT 0,
    winning_trades INTEGER NOT NULL DEFAULT 0,
    total_pnl REAL NOT NULL DEFAULT 0,
    roi REAL NOT NULL DEFAULT 0,
    win_rate REAL NOT NULL DEFAULT 0,
    total_stakes REAL NOT NULL DEFAULT 0,
    winning_stakes REAL NOT NULL DEFAULT 0,
    max_stake REAL NOT NULL DEFAULT 0,
    sum_sq_stakes REAL NOT NULL DEFAULT 0,
    worst_loss REAL NOT NULL DEFAULT 0,
    all_losses_json TEXT NOT NULL DEFAULT '[]',
    score_win_rate REAL NOT NULL DEFAULT 0,
    score_roi REAL NOT NULL DEFAULT 0,
    score_pnl REAL NOT NULL DEFAULT 0,
    score_risk REAL NOT NULL DEFAULT 0,
    risk_status TEXT NOT NULL DEFAULT 'scored',
    confidence_score REAL NOT NULL DEFAULT 0,
    final_score REAL NOT NULL DEFAULT 0,
    w_shrunk REAL NOT NULL DEFAULT 0,
    roi_shrunk REAL NOT NULL DEFAULT 0,
    pnl_shrunk REAL NOT NULL DEFAULT 0,
    calculated_at INTEGER DEFAULT (strftime('%s', 'now'))
);

-- One row per refresh run
CREATE TABLE IF NOT EXISTS leaderboard_metadata (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    total_traders INTEGER NOT NULL DEFAULT 0,
    population_size INTEGER NOT NULL DEFAULT 0,
    excluded_traders INTEGER NOT NULL DEFAULT 0,
    failed_wallets INTEGER NOT NULL DEFAULT 0,
    roi_median REAL NOT NULL DEFAULT 0,
    pnl_median REAL NOT NULL DEFAULT 0,
    anchors_json TEXT,
    config_json TEXT,
    calculated_at INTEGER DEFAULT (strftime('%s', 'now'))
);

-- ========== INDEXES ==========

CREATE INDEX IF NOT EXISTS idx_entries_final_score ON leaderboard_entries(final_score DESC);
CREATE INDEX IF NOT EXISTS idx_metadata_calculated ON leaderboard_metadata(calculated_at DESC)
"#;

/// Columns added after the first release (duplicate-column errors are ignored)
pub const MIGRATIONS: &[&str] = &[
    "ALTER TABLE leaderboard_entries ADD COLUMN confidence_level TEXT NOT NULL DEFAULT 'Very Low'",
    "ALTER TABLE leaderboard_entries ADD COLUMN effective_trade_mass REAL NOT NULL DEFAULT 0",
    "ALTER TABLE leaderboard_entries ADD COLUMN pnl_adjusted REAL NOT NULL DEFAULT 0",
];
