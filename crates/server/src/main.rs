//! Poly-Rank - trader performance leaderboard for prediction markets
//!
//! Usage:
//!   poly-rank serve --port 3001                 - Launch the leaderboard API
//!   poly-rank score --input traders.json        - Score a batch offline
//!   poly-rank refresh --wallets-file wallets.txt - Fetch, score and persist

use axum::{
    extract::{Query, State},
    response::Json,
    routing::{get, post},
    Router,
};
use clap::{Parser, Subcommand};
use engine::cache::DEFAULT_CACHE_TTL_SECS;
use engine::{
    build_all_views, cache_key, legacy_shrunk_values, load_stored_leaderboard, load_wallets,
    rank_by, run_leaderboard_refresh, score_population, wallets_from_leaderboard, MaxStakeMode,
    PolymarketDataClient, RawTraderMetrics, RefreshOptions, RefreshProgress, RefreshStatus,
    ScoredTrader, ScoringConfig, ScoringOutcome, SortView, TtlCache,
};
use persistence::repository::LeaderboardRepository;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

const APP_VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "-", env!("GIT_HASH"));

const DEFAULT_PAGE_LIMIT: usize = 100;

#[derive(Parser)]
#[command(name = "poly-rank")]
#[command(about = "Trader performance scoring for prediction markets", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch the leaderboard web server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
        /// Port to listen on
        #[arg(short, long, default_value_t = 3001)]
        port: u16,
        /// Optional scoring config (JSON)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Seconds a cached leaderboard stays fresh
        #[arg(long, default_value_t = DEFAULT_CACHE_TTL_SECS)]
        cache_ttl: i64,
    },
    /// Score a JSON array of trader metrics (no network, no DB)
    Score {
        /// Input JSON file
        #[arg(short, long)]
        input: PathBuf,
        /// Sort view, e.g. final_score, score_roi, w_shrunk
        #[arg(long, default_value = "final_score")]
        view: String,
        /// Number of rows to print
        #[arg(long, default_value_t = 20)]
        top_n: usize,
        /// Optional scoring config (JSON)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Optional JSON export path
        #[arg(long)]
        export: Option<PathBuf>,
        /// Also report legacy shrinkage estimates
        #[arg(long)]
        legacy_shrinkage: bool,
    },
    /// Fetch closed positions, score and store the leaderboard
    Refresh {
        /// Wallet list, one address per line
        #[arg(long)]
        wallets_file: Option<PathBuf>,
        /// Take wallets from the top N of the public leaderboard instead
        #[arg(long)]
        from_leaderboard: Option<u32>,
        /// Only score the first N wallets
        #[arg(long)]
        max_traders: Option<usize>,
        /// Optional scoring config (JSON)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Use the mean of the five largest stakes as max stake
        #[arg(long)]
        top_five_mean: bool,
        /// Number of rows to print
        #[arg(long, default_value_t = 20)]
        top_n: usize,
    },
}

#[derive(Clone)]
struct AppState {
    db: Arc<persistence::Database>,
    client: Arc<PolymarketDataClient>,
    config: Arc<ScoringConfig>,
    refresh_progress: Arc<RefreshProgress>,
    /// Ranked stored leaderboard per view
    view_cache: Arc<TtlCache<Arc<Vec<ScoredTrader>>>>,
    /// Refresh outcomes keyed by wallet set
    refresh_cache: Arc<TtlCache<Arc<ScoringOutcome>>>,
    wallets_file: PathBuf,
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("debug,engine=debug,persistence=debug,poly_rank=debug")
    } else {
        EnvFilter::new("info,engine=info,persistence=info,poly_rank=info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).compact())
        .with(filter)
        .init();
}

fn load_config(path: Option<&Path>) -> anyhow::Result<ScoringConfig> {
    match path {
        Some(p) => {
            let config = ScoringConfig::from_json_file(p)
                .map_err(|e| anyhow::anyhow!("Invalid config {}: {}", p.display(), e))?;
            info!("Loaded scoring config from {}", p.display());
            Ok(config)
        }
        None => Ok(ScoringConfig::default()),
    }
}

fn default_wallets_file() -> PathBuf {
    std::env::var(engine::leaderboard::WALLETS_FILE_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(engine::leaderboard::DEFAULT_WALLETS_FILE))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    dotenvy::dotenv().ok();

    match cli.command {
        Commands::Serve {
            host,
            port,
            config,
            cache_ttl,
        } => {
            cmd_serve(&host, port, config, cache_ttl).await?;
        }
        Commands::Score {
            input,
            view,
            top_n,
            config,
            export,
            legacy_shrinkage,
        } => {
            cmd_score(input, view, top_n, config, export, legacy_shrinkage)?;
        }
        Commands::Refresh {
            wallets_file,
            from_leaderboard,
            max_traders,
            config,
            top_five_mean,
            top_n,
        } => {
            cmd_refresh(
                wallets_file,
                from_leaderboard,
                max_traders,
                config,
                top_five_mean,
                top_n,
            )
            .await?;
        }
    }

    Ok(())
}

// ============================================================================
// Serve command - Axum web server
// ============================================================================

async fn cmd_serve(
    host: &str,
    port: u16,
    config: Option<PathBuf>,
    cache_ttl: i64,
) -> anyhow::Result<()> {
    info!("Poly-Rank v{} starting...", APP_VERSION);

    let config = load_config(config.as_deref())?;

    let db_path = persistence::db_path_from_env();
    let db = persistence::Database::new(&db_path).await.map_err(|e| {
        error!("Failed to initialize database: {}", e);
        anyhow::anyhow!("Database initialization failed: {}", e)
    })?;
    info!("Database initialized: {}", db_path.display());

    let ttl = chrono::Duration::seconds(cache_ttl.max(0));
    let state = AppState {
        db: Arc::new(db),
        client: Arc::new(PolymarketDataClient::new()),
        config: Arc::new(config),
        refresh_progress: Arc::new(RefreshProgress::new()),
        view_cache: Arc::new(TtlCache::new(ttl)),
        refresh_cache: Arc::new(TtlCache::new(ttl)),
        wallets_file: default_wallets_file(),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .nest("/api", api_routes(state))
        .layer(cors);

    let addr: std::net::SocketAddr = format!("{}:{}", host, port).parse()?;
    println!("\n=== Poly-Rank v{} ===", APP_VERSION);
    println!("Trader Leaderboard Server");
    println!("Listening on http://{}", addr);
    println!("\nEndpoints:");
    println!("  GET  /api/health               - Health check");
    println!("  POST /api/score                - Score an inline batch");
    println!("  GET  /api/leaderboard          - Stored leaderboard (view, limit, offset)");
    println!("  GET  /api/leaderboard/all      - Every sort view + metadata");
    println!("  POST /api/leaderboard/refresh  - Start a leaderboard refresh");
    println!("  GET  /api/leaderboard/status   - Poll refresh progress");
    println!("  POST /api/leaderboard/cancel   - Cancel running refresh");
    println!("\n  Database: {}", db_path.display());
    println!("  Cache TTL: {}s", ttl.num_seconds());
    println!("\nPress Ctrl+C to stop\n");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn api_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(api_health))
        .route("/score", post(api_score))
        .route("/leaderboard", get(api_leaderboard))
        .route("/leaderboard/all", get(api_leaderboard_all))
        .route("/leaderboard/refresh", post(api_start_refresh))
        .route("/leaderboard/status", get(api_refresh_status))
        .route("/leaderboard/cancel", post(api_cancel_refresh))
        .with_state(state)
}

// ============================================================================
// Score command - offline batch scoring
// ============================================================================

fn cmd_score(
    input: PathBuf,
    view: String,
    top_n: usize,
    config: Option<PathBuf>,
    export: Option<PathBuf>,
    legacy_shrinkage: bool,
) -> anyhow::Result<()> {
    println!("\n=== Poly-Rank v{} ===", APP_VERSION);

    let view: SortView = view.parse().map_err(|e: String| anyhow::anyhow!(e))?;
    let config = load_config(config.as_deref())?;

    let raw = std::fs::read_to_string(&input)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", input.display(), e))?;
    let traders: Vec<RawTraderMetrics> = serde_json::from_str(&raw)?;
    println!("Input: {} ({} traders)", input.display(), traders.len());

    let outcome = score_population(&traders, &config)?;
    let ranked = rank_by(&outcome.traders, view);

    print_summary(&outcome);
    print_leaderboard(&ranked, view, top_n);

    if legacy_shrinkage {
        println!("\nLegacy shrinkage estimates:");
        println!(
            "  {:<44} {:>8} {:>10} {:>12}",
            "Wallet", "WR", "ROI%", "PnL"
        );
        for t in ranked.iter().take(top_n) {
            let legacy = legacy_shrunk_values(&t.metrics, &outcome.summary, &config);
            println!(
                "  {:<44} {:>8.4} {:>10.2} {:>12.2}",
                t.metrics.wallet_address, legacy.win_rate, legacy.roi, legacy.pnl
            );
        }
    }

    if let Some(export_path) = export {
        let export_data = serde_json::json!({
            "version": APP_VERSION,
            "view": view,
            "summary": outcome.summary,
            "traders": ranked,
        });
        let json = serde_json::to_string_pretty(&export_data)?;
        std::fs::write(&export_path, &json)?;
        println!("\nResults exported to {}", export_path.display());
    }

    Ok(())
}

// ============================================================================
// Refresh command - CLI mode (no web server)
// ============================================================================

async fn cmd_refresh(
    wallets_file: Option<PathBuf>,
    from_leaderboard: Option<u32>,
    max_traders: Option<usize>,
    config: Option<PathBuf>,
    top_five_mean: bool,
    top_n: usize,
) -> anyhow::Result<()> {
    println!("\n=== Poly-Rank v{} ===", APP_VERSION);

    let config = load_config(config.as_deref())?;

    let db_path = persistence::db_path_from_env();
    let db = persistence::Database::new(&db_path)
        .await
        .map_err(|e| anyhow::anyhow!("Database initialization failed: {}", e))?;
    let stored = LeaderboardRepository::new(db.pool())
        .count_entries()
        .await
        .unwrap_or(0);
    println!("Database: {} ({} traders stored)", db_path.display(), stored);

    let client = Arc::new(PolymarketDataClient::new());
    let mut wallets = match from_leaderboard {
        Some(limit) => {
            println!("Wallets: top {} of the Polymarket leaderboard", limit);
            wallets_from_leaderboard(&client, limit).await?
        }
        None => {
            let path = wallets_file.unwrap_or_else(default_wallets_file);
            println!("Wallets: {}", path.display());
            load_wallets(&path)?
        }
    };
    truncate_wallets(&mut wallets, max_traders);
    if wallets.is_empty() {
        anyhow::bail!("No wallets to refresh");
    }

    let options = RefreshOptions {
        max_stake_mode: if top_five_mean {
            MaxStakeMode::TopFiveMean
        } else {
            MaxStakeMode::Largest
        },
        ..RefreshOptions::default()
    };
    println!(
        "Traders: {} | Max stake: {:?} | Top N: {}",
        wallets.len(),
        options.max_stake_mode,
        top_n
    );
    println!();

    let progress = Arc::new(RefreshProgress::new());
    progress.reset();

    let progress_for_ctrlc = progress.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Ctrl+C received, requesting cancel...");
        progress_for_ctrlc.cancel();
    });

    // Spawn the refresh in background and monitor progress
    let progress_clone = progress.clone();
    let db_pool = Some(db.pool_clone());
    let refresh_handle = tokio::spawn(async move {
        run_leaderboard_refresh(
            client.as_ref(),
            &progress_clone,
            &wallets,
            &config,
            options,
            db_pool,
        )
        .await
    });

    // Progress display loop
    loop {
        tokio::time::sleep(tokio::time::Duration::from_millis(500)).await;
        let snap = progress.snapshot();

        match snap.status {
            RefreshStatus::FetchingPositions => {
                let pct = if snap.total_wallets > 0 {
                    snap.fetched as f64 / snap.total_wallets as f64 * 100.0
                } else {
                    0.0
                };
                let bar_len = 30;
                let filled = (pct as usize * bar_len) / 100;
                let bar: String = "=".repeat(filled) + &" ".repeat(bar_len - filled);
                print!(
                    "\r  Fetching [{}] {:.0}% ({}/{}, {} failed) {}   ",
                    bar, pct, snap.fetched, snap.total_wallets, snap.failed, snap.current_wallet
                );
            }
            RefreshStatus::Scoring => {
                print!("\r  Scoring traders...                                              ");
            }
            RefreshStatus::Saving => {
                print!("\r  Saving leaderboard...                                           ");
            }
            RefreshStatus::Complete => {
                println!(
                    "\r  Complete! ({} fetched, {} failed)                                   ",
                    snap.fetched, snap.failed
                );
                break;
            }
            RefreshStatus::Cancelled => {
                println!("\r  Cancelled, nothing was saved.                                  ");
                break;
            }
            RefreshStatus::Error => {
                println!(
                    "\r  Error: {}                                      ",
                    snap.error_message.unwrap_or_default()
                );
                break;
            }
            RefreshStatus::Idle => {}
        }
    }

    let outcome = match refresh_handle.await? {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!("Refresh did not complete: {}", e);
            return Ok(());
        }
    };

    print_summary(&outcome);
    print_leaderboard(&rank_by(&outcome.traders, SortView::FinalScore), SortView::FinalScore, top_n);

    Ok(())
}

fn print_summary(outcome: &ScoringOutcome) {
    let s = &outcome.summary;
    println!(
        "\nScored {} of {} traders (population {}, excluded {})",
        outcome.traders.len(),
        s.total_traders,
        s.population_size,
        s.excluded_traders
    );
    println!(
        "  ROI median: {:.2}% | PnL median: {:.2}",
        s.roi_median, s.pnl_median
    );
}

fn print_leaderboard(ranked: &[ScoredTrader], view: SortView, top_n: usize) {
    println!("\nTop {} by {}:", ranked.len().min(top_n), view);
    println!(
        "  {:>3}  {:<44} {:>7} {:>7} {:>12} {:>6} {:>6} {:>6} {:>6} {:>6}",
        "#", "Wallet", "Trades", "WR%", "PnL", "Win", "ROI", "PnL", "Risk", "Final"
    );
    println!("  {}", "-".repeat(118));
    for t in ranked.iter().take(top_n) {
        println!(
            "  {:>3}  {:<44} {:>7} {:>6.1}% {:>+12.2} {:>6.3} {:>6.3} {:>6.3} {:>6.3} {:>6.2}",
            t.rank.unwrap_or_default(),
            t.metrics.wallet_address,
            t.metrics.total_trades,
            t.metrics.win_rate,
            t.metrics.total_pnl,
            t.score_win_rate,
            t.score_roi,
            t.score_pnl,
            t.score_risk,
            t.final_score,
        );
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn truncate_wallets(wallets: &mut Vec<String>, max_traders: Option<usize>) {
    if let Some(max) = max_traders {
        wallets.truncate(max);
    }
}

fn parse_view(raw: Option<&String>) -> Result<SortView, String> {
    match raw {
        Some(s) => s.parse(),
        None => Ok(SortView::FinalScore),
    }
}

fn page<T>(items: &[T], offset: usize, limit: usize) -> &[T] {
    let start = offset.min(items.len());
    let end = start.saturating_add(limit).min(items.len());
    &items[start..end]
}

fn view_cache_key(view: SortView) -> String {
    format!("view:{}", view.name())
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health
async fn api_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "poly-rank",
        "version": APP_VERSION,
    }))
}

#[derive(Debug, Deserialize)]
struct ScoreRequest {
    traders: Vec<RawTraderMetrics>,
    view: Option<SortView>,
    config: Option<ScoringConfig>,
    limit: Option<usize>,
    #[serde(default)]
    legacy_shrinkage: bool,
}

/// POST /api/score - score an inline batch
async fn api_score(
    State(state): State<AppState>,
    Json(request): Json<ScoreRequest>,
) -> Json<serde_json::Value> {
    let config = request
        .config
        .unwrap_or_else(|| state.config.as_ref().clone());
    let view = request.view.unwrap_or(SortView::FinalScore);

    let outcome = match score_population(&request.traders, &config) {
        Ok(o) => o,
        Err(e) => {
            return Json(serde_json::json!({
                "success": false,
                "error": format!("Scoring failed: {}", e),
            }))
        }
    };

    let mut ranked = rank_by(&outcome.traders, view);
    if let Some(limit) = request.limit {
        ranked.truncate(limit);
    }

    let legacy: Option<Vec<serde_json::Value>> = request.legacy_shrinkage.then(|| {
        ranked
            .iter()
            .map(|t| {
                serde_json::json!({
                    "wallet_address": t.metrics.wallet_address,
                    "shrunk": legacy_shrunk_values(&t.metrics, &outcome.summary, &config),
                })
            })
            .collect()
    });

    Json(serde_json::json!({
        "success": true,
        "view": view,
        "summary": outcome.summary,
        "data": ranked,
        "legacy_shrinkage": legacy,
    }))
}

/// GET /api/leaderboard - stored leaderboard ranked by one view
async fn api_leaderboard(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<serde_json::Value> {
    let view = match parse_view(params.get("view")) {
        Ok(v) => v,
        Err(e) => {
            return Json(serde_json::json!({
                "success": false,
                "error": e,
                "data": [],
                "total": 0,
            }))
        }
    };
    let limit: usize = params
        .get("limit")
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_PAGE_LIMIT);
    let offset: usize = params
        .get("offset")
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);

    let key = view_cache_key(view);
    let (ranked, cached) = match state.view_cache.get(&key).await {
        Some(r) => (r, true),
        None => match load_stored_leaderboard(state.db.pool()).await {
            Ok(traders) => {
                let ranked = Arc::new(rank_by(&traders, view));
                state.view_cache.insert(key, ranked.clone()).await;
                (ranked, false)
            }
            Err(e) => {
                return Json(serde_json::json!({
                    "success": false,
                    "error": format!("Failed to load leaderboard: {}", e),
                    "data": [],
                    "total": 0,
                }))
            }
        },
    };

    Json(serde_json::json!({
        "success": true,
        "view": view,
        "data": page(ranked.as_slice(), offset, limit),
        "total": ranked.len(),
        "limit": limit,
        "offset": offset,
        "cached": cached,
    }))
}

/// GET /api/leaderboard/all - every view plus the latest refresh metadata
async fn api_leaderboard_all(State(state): State<AppState>) -> Json<serde_json::Value> {
    let traders = match load_stored_leaderboard(state.db.pool()).await {
        Ok(t) => t,
        Err(e) => {
            return Json(serde_json::json!({
                "success": false,
                "error": format!("Failed to load leaderboard: {}", e),
            }))
        }
    };

    let views: BTreeMap<&'static str, Vec<ScoredTrader>> = build_all_views(&traders)
        .into_iter()
        .map(|(view, ranked)| (view.name(), ranked))
        .collect();

    let metadata = LeaderboardRepository::new(state.db.pool())
        .get_latest_metadata()
        .await
        .unwrap_or_else(|e| {
            warn!("Failed to load leaderboard metadata: {}", e);
            None
        });
    let calculated_at = metadata
        .as_ref()
        .and_then(|m| m.calculated_at_utc())
        .map(|t| t.to_rfc3339());

    Json(serde_json::json!({
        "success": true,
        "total": traders.len(),
        "views": views,
        "metadata": metadata,
        "calculated_at": calculated_at,
    }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RefreshRequest {
    wallets: Option<Vec<String>>,
    from_leaderboard: Option<u32>,
    max_traders: Option<usize>,
}

fn refresh_already_running(progress: &RefreshProgress) -> Json<serde_json::Value> {
    let snap = progress.snapshot();
    Json(serde_json::json!({
        "success": false,
        "message": format!(
            "Refresh already running ({}/{} wallets)",
            snap.fetched, snap.total_wallets
        ),
    }))
}

/// POST /api/leaderboard/refresh - start a refresh in the background
async fn api_start_refresh(
    State(state): State<AppState>,
    body: Option<Json<RefreshRequest>>,
) -> Json<serde_json::Value> {
    if state.refresh_progress.is_running() {
        return refresh_already_running(&state.refresh_progress);
    }

    let request = body.map(|Json(r)| r).unwrap_or_default();

    let wallets = match (request.wallets, request.from_leaderboard) {
        (Some(w), _) => Ok(engine::leaderboard::parse_wallet_list(&w.join("\n"))),
        (None, Some(limit)) => wallets_from_leaderboard(&state.client, limit).await,
        (None, None) => load_wallets(&state.wallets_file),
    };
    let mut wallets = match wallets {
        Ok(w) => w,
        Err(e) => {
            return Json(serde_json::json!({
                "success": false,
                "error": format!("Failed to resolve wallets: {}", e),
            }))
        }
    };
    truncate_wallets(&mut wallets, request.max_traders);
    if wallets.is_empty() {
        return Json(serde_json::json!({
            "success": false,
            "error": "No wallets to refresh",
        }));
    }

    let key = cache_key(&wallets, request.max_traders);
    if let Some(outcome) = state.refresh_cache.get(&key).await {
        info!(traders = outcome.traders.len(), "Serving cached refresh result");
        return Json(serde_json::json!({
            "success": true,
            "cached": true,
            "message": "Leaderboard is fresh, refresh skipped",
            "summary": outcome.summary,
        }));
    }

    // Another request may have started a run while wallets were resolved
    if !state.refresh_progress.try_start() {
        return refresh_already_running(&state.refresh_progress);
    }
    info!(wallets = wallets.len(), "Starting leaderboard refresh");

    let count = wallets.len();
    let client = state.client.clone();
    let progress = state.refresh_progress.clone();
    let config = state.config.clone();
    let view_cache = state.view_cache.clone();
    let refresh_cache = state.refresh_cache.clone();
    let db_pool = Some(state.db.pool_clone());

    tokio::spawn(async move {
        let result = run_leaderboard_refresh(
            client.as_ref(),
            &progress,
            &wallets,
            &config,
            RefreshOptions::default(),
            db_pool,
        )
        .await;
        match result {
            Ok(outcome) => {
                view_cache.clear().await;
                refresh_cache.insert(key, Arc::new(outcome)).await;
            }
            Err(e) => warn!("Leaderboard refresh ended early: {}", e),
        }
    });

    Json(serde_json::json!({
        "success": true,
        "cached": false,
        "message": "Leaderboard refresh started",
        "wallets": count,
    }))
}

/// GET /api/leaderboard/status - poll refresh progress
async fn api_refresh_status(State(state): State<AppState>) -> Json<serde_json::Value> {
    let snap = state.refresh_progress.snapshot();
    let pct = if snap.total_wallets > 0 {
        snap.fetched as f64 / snap.total_wallets as f64 * 100.0
    } else {
        0.0
    };
    Json(serde_json::json!({
        "running": state.refresh_progress.is_running(),
        "progress_pct": pct,
        "status": snap,
    }))
}

/// POST /api/leaderboard/cancel - cancel running refresh
async fn api_cancel_refresh(State(state): State<AppState>) -> Json<serde_json::Value> {
    if !state.refresh_progress.is_running() {
        return Json(serde_json::json!({
            "success": false,
            "message": "No refresh running",
        }));
    }
    state.refresh_progress.cancel();
    info!("Leaderboard refresh cancel requested");
    let cancelled = state.refresh_progress.cancelled.load(Ordering::Relaxed);
    Json(serde_json::json!({
        "success": cancelled,
        "message": "Cancel requested",
    }))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_bounds() {
        let items: Vec<u32> = (1..=10).collect();
        assert_eq!(page(&items, 0, 3), &[1, 2, 3]);
        assert_eq!(page(&items, 8, 5), &[9, 10]);
        assert!(page(&items, 20, 5).is_empty());
        assert_eq!(page(&items, 2, usize::MAX).len(), 8);
    }

    #[test]
    fn test_parse_view_defaults_to_final_score() {
        assert_eq!(parse_view(None), Ok(SortView::FinalScore));
        let raw = "score_roi".to_string();
        assert_eq!(parse_view(Some(&raw)), Ok(SortView::ScoreRoi));
        let bad = "nope".to_string();
        assert!(parse_view(Some(&bad)).is_err());
    }

    #[test]
    fn test_truncate_wallets() {
        let mut wallets = vec!["0xa".to_string(), "0xb".to_string(), "0xc".to_string()];
        truncate_wallets(&mut wallets, None);
        assert_eq!(wallets.len(), 3);
        truncate_wallets(&mut wallets, Some(2));
        assert_eq!(wallets, vec!["0xa", "0xb"]);
    }

    #[test]
    fn test_view_cache_key() {
        assert_eq!(view_cache_key(SortView::WShrunk), "view:w_shrunk");
    }

    async fn test_state() -> AppState {
        let db = persistence::Database::in_memory().await.unwrap();
        AppState {
            db: Arc::new(db),
            client: Arc::new(PolymarketDataClient::with_base_url("http://127.0.0.1:9")),
            config: Arc::new(ScoringConfig::default()),
            refresh_progress: Arc::new(RefreshProgress::new()),
            view_cache: Arc::new(TtlCache::default()),
            refresh_cache: Arc::new(TtlCache::default()),
            wallets_file: PathBuf::from("missing-wallets.txt"),
        }
    }

    #[tokio::test]
    async fn test_api_score_ranks_inline_batch() {
        let state = test_state().await;
        let request: ScoreRequest = serde_json::from_value(serde_json::json!({
            "traders": [
                { "wallet_address": "0xa", "total_trades": 50, "total_trades_with_pnl": 50,
                  "win_rate": 60.0, "roi": 10.0, "total_pnl": 5000.0,
                  "total_stakes": 50000.0, "winning_stakes": 30000.0, "worst_loss": -500.0 },
                { "wallet_address": "0xb", "total_trades": 0 }
            ],
            "view": "final_score"
        }))
        .unwrap();

        let Json(body) = api_score(State(state), Json(request)).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"][0]["wallet_address"], "0xa");
        assert_eq!(body["data"][0]["rank"], 1);
        assert_eq!(body["summary"]["total_traders"], 2);
    }

    #[tokio::test]
    async fn test_api_leaderboard_caches_view() {
        let state = test_state().await;
        let mut params = HashMap::new();
        params.insert("view".to_string(), "score_roi".to_string());

        let Json(first) = api_leaderboard(State(state.clone()), Query(params.clone())).await;
        assert_eq!(first["success"], true);
        assert_eq!(first["cached"], false);
        assert_eq!(first["total"], 0);

        let Json(second) = api_leaderboard(State(state), Query(params)).await;
        assert_eq!(second["cached"], true);
    }

    #[tokio::test]
    async fn test_api_leaderboard_rejects_unknown_view() {
        let state = test_state().await;
        let mut params = HashMap::new();
        params.insert("view".to_string(), "bogus".to_string());
        let Json(body) = api_leaderboard(State(state), Query(params)).await;
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_api_refresh_serves_cached_outcome() {
        let state = test_state().await;
        let wallets = vec!["0xa".to_string()];
        state
            .refresh_cache
            .insert(cache_key(&wallets, None), Arc::new(ScoringOutcome::default()))
            .await;

        let request = RefreshRequest {
            wallets: Some(wallets),
            ..Default::default()
        };
        let Json(body) = api_start_refresh(State(state.clone()), Some(Json(request))).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["cached"], true);
        assert!(!state.refresh_progress.is_running());
    }

    #[tokio::test]
    async fn test_api_refresh_rejects_second_start() {
        let state = test_state().await;
        let request = || RefreshRequest {
            wallets: Some(vec!["0xa".to_string(), "0xb".to_string()]),
            ..Default::default()
        };

        let Json(first) = api_start_refresh(State(state.clone()), Some(Json(request()))).await;
        assert_eq!(first["success"], true);
        assert_eq!(first["cached"], false);
        assert!(state.refresh_progress.is_running());

        let Json(second) = api_start_refresh(State(state.clone()), Some(Json(request()))).await;
        assert_eq!(second["success"], false);
        state.refresh_progress.cancel();
    }

    #[tokio::test]
    async fn test_api_refresh_without_wallet_file_fails() {
        let state = test_state().await;
        let Json(body) = api_start_refresh(State(state), None).await;
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_api_cancel_when_idle() {
        let state = test_state().await;
        let Json(body) = api_cancel_refresh(State(state)).await;
        assert_eq!(body["success"], false);
    }
}
