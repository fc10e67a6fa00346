//! Polymarket Data API client - public endpoints, no authentication required
//!
//! Uses `data-api.polymarket.com` for the leaderboard and per-wallet closed positions.

use anyhow::Result;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, warn};

const BASE_URL: &str = "https://data-api.polymarket.com";

/// Closed-positions page size; the API caps `limit` at 50
pub const CLOSED_POSITIONS_PAGE_SIZE: usize = 50;

/// Hard stop for pathological wallets
const MAX_CLOSED_POSITIONS: usize = 10_000;

/// Hard bound on requests per wallet
const MAX_CLOSED_POSITION_PAGES: usize = MAX_CLOSED_POSITIONS / CLOSED_POSITIONS_PAGE_SIZE;

/// Polymarket Data API client
#[derive(Clone)]
pub struct PolymarketDataClient {
    client: Client,
    base_url: String,
}

// ---------------------------------------------------------------------------
// Deserialization structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub rank: Option<String>,
    pub proxy_wallet: Option<String>,
    pub user_name: Option<String>,
    pub vol: Option<f64>,
    pub pnl: Option<f64>,
}

/// One resolved position of a wallet
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosedPosition {
    pub proxy_wallet: Option<String>,
    pub asset: Option<String>,
    pub condition_id: Option<String>,
    pub avg_price: Option<f64>,
    pub total_bought: Option<f64>,
    pub realized_pnl: Option<f64>,
    pub cur_price: Option<f64>,
    pub title: Option<String>,
    pub outcome: Option<String>,
    pub timestamp: Option<i64>,
}

impl ClosedPosition {
    /// Dedup key across pages
    fn identity(&self) -> Option<String> {
        let asset = self.asset.as_deref().or(self.condition_id.as_deref())?;
        Some(format!("{}:{}", asset, self.outcome.as_deref().unwrap_or("")))
    }
}

// ---------------------------------------------------------------------------
// Client implementation
// ---------------------------------------------------------------------------

impl Default for PolymarketDataClient {
    fn default() -> Self {
        Self::new()
    }
}

impl PolymarketDataClient {
    pub fn new() -> Self {
        Self::with_base_url(BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// GET /v1/leaderboard - top traders by PnL
    pub async fn get_leaderboard(&self, limit: u32) -> Result<Vec<LeaderboardEntry>> {
        let url = format!(
            "{}/v1/leaderboard?category=OVERALL&timePeriod=ALL&orderBy=PNL&limit={}",
            self.base_url, limit
        );
        debug!("Fetching leaderboard: {}", url);

        let resp = self.client.get(&url).send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Polymarket leaderboard error {}: {}", status, body);
        }

        let entries: Vec<LeaderboardEntry> = resp.json().await?;
        debug!(count = entries.len(), "Leaderboard fetched");
        Ok(entries)
    }

    /// One page of GET /v1/closed-positions?user={address}
    pub async fn get_closed_positions_page(
        &self,
        address: &str,
        offset: usize,
    ) -> Result<Vec<ClosedPosition>> {
        let url = format!(
            "{}/v1/closed-positions?user={}&sortBy=timestamp&sortDirection=DESC&limit={}&offset={}",
            self.base_url, address, CLOSED_POSITIONS_PAGE_SIZE, offset
        );

        let resp = self.client.get(&url).send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Polymarket closed-positions error {}: {}", status, body);
        }

        let page: Vec<ClosedPosition> = resp.json().await?;
        Ok(page)
    }

    /// Every closed position of a wallet, paging until a short page.
    ///
    /// Positions repeated across pages are kept once. Paging also stops when
    /// a page adds nothing new or the page limit is reached.
    pub async fn get_closed_positions(&self, address: &str) -> Result<Vec<ClosedPosition>> {
        debug!(address, "Fetching closed positions");

        let mut all = Vec::new();
        let mut seen = HashSet::new();
        let mut offset = 0;

        for page_index in 0..MAX_CLOSED_POSITION_PAGES {
            let page = self.get_closed_positions_page(address, offset).await?;
            let received = page.len();
            let added = merge_page(&mut all, &mut seen, page);

            if received < CLOSED_POSITIONS_PAGE_SIZE {
                break;
            }
            if added == 0 {
                warn!(address, offset, "Closed positions page repeated, stopping");
                break;
            }
            if all.len() >= MAX_CLOSED_POSITIONS {
                warn!(address, count = all.len(), "Closed positions capped");
                break;
            }
            if page_index + 1 == MAX_CLOSED_POSITION_PAGES {
                warn!(address, pages = MAX_CLOSED_POSITION_PAGES, "Closed positions page limit reached");
                break;
            }
            offset += received;

            // Rate limit
            tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        }

        debug!(address, count = all.len(), "Closed positions fetched");
        Ok(all)
    }
}

/// Append the positions of `page` not seen before; returns how many were added.
fn merge_page(
    all: &mut Vec<ClosedPosition>,
    seen: &mut HashSet<String>,
    page: Vec<ClosedPosition>,
) -> usize {
    let before = all.len();
    for position in page {
        if let Some(id) = position.identity() {
            if !seen.insert(id) {
                continue;
            }
        }
        all.push(position);
    }
    all.len() - before
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closed_position_deserialize_camel_case() {
        let json = r#"{
            "proxyWallet": "0xabc",
            "asset": "123",
            "conditionId": "0xcond",
            "avgPrice": 0.42,
            "totalBought": 1000.0,
            "realizedPnl": -120.5,
            "curPrice": 0,
            "title": "Will it rain?",
            "outcome": "Yes",
            "timestamp": 1717000000
        }"#;
        let p: ClosedPosition = serde_json::from_str(json).unwrap();
        assert_eq!(p.avg_price, Some(0.42));
        assert_eq!(p.total_bought, Some(1000.0));
        assert_eq!(p.realized_pnl, Some(-120.5));
        assert_eq!(p.identity().as_deref(), Some("123:Yes"));
    }

    #[test]
    fn test_closed_position_missing_fields() {
        let p: ClosedPosition = serde_json::from_str("{}").unwrap();
        assert!(p.realized_pnl.is_none());
        assert!(p.identity().is_none());
    }

    fn page_of(assets: std::ops::Range<usize>) -> Vec<ClosedPosition> {
        assets
            .map(|i| ClosedPosition {
                asset: Some(i.to_string()),
                outcome: Some("Yes".into()),
                ..Default::default()
            })
            .collect()
    }

    #[test]
    fn test_merge_page_skips_repeated_positions() {
        let mut all = Vec::new();
        let mut seen = HashSet::new();

        assert_eq!(merge_page(&mut all, &mut seen, page_of(0..50)), 50);
        // A server ignoring `offset` returns the same full page again
        assert_eq!(merge_page(&mut all, &mut seen, page_of(0..50)), 0);
        assert_eq!(merge_page(&mut all, &mut seen, page_of(40..60)), 10);
        assert_eq!(all.len(), 60);
    }

    #[test]
    fn test_merge_page_keeps_positions_without_identity() {
        let mut all = Vec::new();
        let mut seen = HashSet::new();
        let anonymous = vec![ClosedPosition::default(), ClosedPosition::default()];
        assert_eq!(merge_page(&mut all, &mut seen, anonymous), 2);
    }

    #[test]
    fn test_page_limit_covers_position_cap() {
        assert!(MAX_CLOSED_POSITION_PAGES * CLOSED_POSITIONS_PAGE_SIZE >= MAX_CLOSED_POSITIONS);
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = PolymarketDataClient::with_base_url("http://localhost:9999/");
        assert_eq!(client.base_url, "http://localhost:9999");
    }
}
