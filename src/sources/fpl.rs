//! Fantasy Premier League public API client.
//!
//! Read-only. Covers the four endpoints the backend needs:
//! - `/stats/most-valuable-teams/`: ranking source for pairing
//! - `/event-status/`: gameweek resolution
//! - `/bootstrap-static/`: team and player reference data
//! - `/entry/{id}/event/{gw}/picks/`: manager picks proxy
//!
//! Base URL: https://fantasy.premierleague.com/api
//! Auth: none.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::{GameweekResolver, RankingSource, ReferenceSource};
use crate::types::{BootstrapData, Player, RankedEntity, Team};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

pub const DEFAULT_BASE_URL: &str = "https://fantasy.premierleague.com/api";

const USER_AGENT: &str = "fplduel/0.1.0 (+https://github.com/divin3circle/fplduel)";

/// Fixed timeout for the picks proxy, independent of the client default.
const DEFAULT_PICKS_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// API response types (FPL JSON → Rust)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ValuableTeam {
    entry: i64,
    name: String,
    player_name: String,
    #[serde(default)]
    value_with_bank: i64,
    #[serde(default)]
    total_transfers: i64,
}

#[derive(Debug, Deserialize)]
struct EventStatus {
    #[serde(default)]
    event: i64,
}

#[derive(Debug, Deserialize)]
struct EventStatusResponse {
    #[serde(default)]
    status: Vec<EventStatus>,
}

#[derive(Debug, Deserialize)]
struct BootstrapTeam {
    id: i64,
    code: i64,
    name: String,
    short_name: String,
    #[serde(default)]
    strength: i64,
}

#[derive(Debug, Deserialize)]
struct BootstrapElement {
    id: i64,
    code: i64,
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    second_name: String,
    #[serde(default)]
    web_name: String,
    #[serde(default)]
    team: i64,
    #[serde(default)]
    team_code: i64,
    #[serde(default)]
    element_type: i64,
    #[serde(default)]
    total_points: i64,
    #[serde(default)]
    form: String,
    #[serde(default)]
    photo: Option<String>,
    #[serde(default)]
    news: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BootstrapResponse {
    #[serde(default)]
    teams: Vec<BootstrapTeam>,
    #[serde(default)]
    elements: Vec<BootstrapElement>,
}

impl From<ValuableTeam> for RankedEntity {
    fn from(t: ValuableTeam) -> Self {
        RankedEntity {
            entry_id: t.entry,
            name: t.name,
            manager_name: t.player_name,
            value: t.value_with_bank,
            transfers: t.total_transfers,
        }
    }
}

impl BootstrapElement {
    fn into_player(self, now: chrono::DateTime<Utc>) -> Player {
        let full_name = format!("{} {}", self.first_name, self.second_name);
        let name = if full_name.trim().is_empty() {
            self.web_name.clone()
        } else {
            full_name.trim().to_string()
        };
        Player {
            id: self.id,
            code: self.code,
            name,
            web_name: self.web_name,
            team_id: self.team,
            team_code: self.team_code,
            element_type: self.element_type,
            total_points: self.total_points,
            form: self.form,
            photo: self.photo.filter(|p| !p.is_empty()),
            news: self.news.filter(|n| !n.is_empty()),
            updated_at: now,
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// FPL API client. Cheap to share behind an `Arc`.
pub struct FplClient {
    http: Client,
    base_url: String,
    picks_timeout: Duration,
}

impl FplClient {
    /// Create a client with its own HTTP connection pool.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client for FPL")?;
        Ok(Self::with_client(http, base_url))
    }

    /// Create a client around an existing `reqwest::Client`.
    pub fn with_client(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            picks_timeout: DEFAULT_PICKS_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_picks_timeout(mut self, timeout: Duration) -> Self {
        self.picks_timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET a JSON document relative to the base URL.
    async fn get_json<T: DeserializeOwned>(&self, path: &str, timeout: Option<Duration>) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "Fetching FPL endpoint");

        let mut req = self.http.get(&url).header("Accept", "application/json");
        if let Some(t) = timeout {
            req = req.timeout(t);
        }

        let resp = req
            .send()
            .await
            .with_context(|| format!("FPL request to {path} failed"))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("FPL {path} returned status {status}"));
        }

        resp.json::<T>()
            .await
            .with_context(|| format!("Failed to parse FPL {path} response"))
    }
}

#[async_trait]
impl RankingSource for FplClient {
    async fn fetch_top_ranked(&self, n: usize) -> Result<Vec<RankedEntity>> {
        let teams: Vec<ValuableTeam> = self.get_json("/stats/most-valuable-teams/", None).await?;
        debug!(returned = teams.len(), requested = n, "Most valuable teams fetched");
        Ok(teams.into_iter().take(n).map(RankedEntity::from).collect())
    }
}

#[async_trait]
impl GameweekResolver for FplClient {
    /// The gameweek after the last one reported by the event status feed.
    async fn current_gameweek(&self) -> Result<i64> {
        let status: EventStatusResponse = self.get_json("/event-status/", None).await?;
        let last = status
            .status
            .first()
            .ok_or_else(|| anyhow!("FPL event status list is empty"))?;
        Ok(last.event + 1)
    }
}

#[async_trait]
impl ReferenceSource for FplClient {
    async fn fetch_bootstrap(&self) -> Result<BootstrapData> {
        let data: BootstrapResponse = self.get_json("/bootstrap-static/", None).await?;
        let now = Utc::now();

        let teams = data
            .teams
            .into_iter()
            .map(|t| Team {
                id: t.id,
                code: t.code,
                name: t.name,
                short_name: t.short_name,
                strength: t.strength,
                updated_at: now,
            })
            .collect();
        let players = data.elements.into_iter().map(|e| e.into_player(now)).collect();

        Ok(BootstrapData { teams, players })
    }

    async fn fetch_manager_picks(&self, entry_id: i64, gameweek: i64) -> Result<serde_json::Value> {
        let path = format!("/entry/{entry_id}/event/{gameweek}/picks/");
        self.get_json(&path, Some(self.picks_timeout)).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
