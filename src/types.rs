//! Shared types for the FPL Duel backend.
//!
//! These types form the data model used across all modules. Sources,
//! stores, the generation engine and the HTTP surface all depend on them,
//! so they carry no I/O of their own.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Ranked entities
// ---------------------------------------------------------------------------

/// A ranked FPL entry as returned by the ranking source.
///
/// Ephemeral: consumed once per generation cycle and never persisted
/// on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedEntity {
    pub entry_id: i64,
    pub name: String,
    pub manager_name: String,
    /// Squad value including bank, in tenths of a million.
    pub value: i64,
    pub transfers: i64,
}

impl fmt::Display for RankedEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, #{})", self.name, self.manager_name, self.entry_id)
    }
}

/// Two ranked entities paired for one matchup, with their slot indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pairing {
    pub home: RankedEntity,
    pub away: RankedEntity,
    pub assigned_home: usize,
    pub assigned_away: usize,
}

// ---------------------------------------------------------------------------
// Matchups
// ---------------------------------------------------------------------------

/// One side of a matchup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchupSide {
    pub entry_id: i64,
    pub name: String,
    pub manager_name: String,
    pub value: i64,
    pub transfers: i64,
    pub score: i64,
}

impl MatchupSide {
    /// Build a fresh side (score 0) from a ranked entity.
    pub fn from_entity(entity: &RankedEntity) -> Self {
        Self {
            entry_id: entity.entry_id,
            name: entity.name.clone(),
            manager_name: entity.manager_name.clone(),
            value: entity.value,
            transfers: entity.transfers,
            score: 0,
        }
    }
}

/// A matchup that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMatchup {
    pub home: MatchupSide,
    pub away: MatchupSide,
    pub assigned_home: i64,
    pub assigned_away: i64,
    pub gameweek: i64,
}

impl NewMatchup {
    /// Draft an unprovisioned, zero-score matchup for the given gameweek.
    pub fn from_pairing(pairing: &Pairing, gameweek: i64) -> Self {
        Self {
            home: MatchupSide::from_entity(&pairing.home),
            away: MatchupSide::from_entity(&pairing.away),
            assigned_home: pairing.assigned_home as i64,
            assigned_away: pairing.assigned_away as i64,
            gameweek,
        }
    }
}

/// A persisted head-to-head matchup for one gameweek.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matchup {
    pub id: String,
    pub home: MatchupSide,
    pub away: MatchupSide,
    pub assigned_home: i64,
    pub assigned_away: i64,
    /// Address of the deployed betting contract, once provisioned.
    pub contract_address: Option<String>,
    pub gameweek: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Matchup {
    /// Whether a betting contract has been deployed for this matchup.
    pub fn is_provisioned(&self) -> bool {
        self.contract_address.is_some()
    }

    /// Sum of the two slot indices. Equals `pool_size - 1` for every
    /// matchup produced by the pairing engine.
    pub fn slot_sum(&self) -> i64 {
        self.assigned_home + self.assigned_away
    }
}

impl fmt::Display for Matchup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[GW{}] {} {} - {} {} ({})",
            self.gameweek,
            self.home.name,
            self.home.score,
            self.away.score,
            self.away.name,
            self.contract_address.as_deref().unwrap_or("unprovisioned"),
        )
    }
}

/// Virtual liquidity seeded into each betting contract, in whole HBAR.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolParams {
    pub home: Decimal,
    pub draw: Decimal,
    pub away: Decimal,
}

impl Default for PoolParams {
    fn default() -> Self {
        Self {
            home: dec!(100),
            draw: dec!(50),
            away: dec!(100),
        }
    }
}

/// Outcome of a single generation cycle.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationReport {
    pub gameweek: i64,
    /// Matchups that were persisted, in pairing order.
    pub created: Vec<Matchup>,
    /// Pairs that failed at the persistence step.
    pub failed: usize,
}

impl GenerationReport {
    pub fn provisioned(&self) -> usize {
        self.created.iter().filter(|m| m.is_provisioned()).count()
    }
}

impl fmt::Display for GenerationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "GW{}: created={} provisioned={} failed={}",
            self.gameweek,
            self.created.len(),
            self.provisioned(),
            self.failed,
        )
    }
}

// ---------------------------------------------------------------------------
// Bets
// ---------------------------------------------------------------------------

/// Predicted result of a matchup.
///
/// Stored and transmitted as the integers 0/1/2; anything else is
/// rejected at conversion time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Outcome {
    Home,
    Away,
    Draw,
}

impl Outcome {
    pub const ALL: &'static [Outcome] = &[Outcome::Home, Outcome::Away, Outcome::Draw];

    /// Storage representation.
    pub fn code(self) -> i64 {
        match self {
            Outcome::Home => 0,
            Outcome::Away => 1,
            Outcome::Draw => 2,
        }
    }
}

impl TryFrom<i64> for Outcome {
    type Error = DuelError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Outcome::Home),
            1 => Ok(Outcome::Away),
            2 => Ok(Outcome::Draw),
            other => Err(DuelError::InvalidInput(format!(
                "unknown predicted outcome {other} (expected 0, 1 or 2)"
            ))),
        }
    }
}

impl From<Outcome> for i64 {
    fn from(outcome: Outcome) -> Self {
        outcome.code()
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Home => write!(f, "HOME"),
            Outcome::Away => write!(f, "AWAY"),
            Outcome::Draw => write!(f, "DRAW"),
        }
    }
}

/// A bet as submitted by a client, before it is recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBet {
    pub matchup_id: String,
    pub bettor: String,
    pub predicted: Outcome,
    pub amount: i64,
    pub odds: f64,
    pub txn_ref: String,
}

impl NewBet {
    /// Reject bets that can never be valid regardless of storage state.
    pub fn validate(&self) -> DuelResult<()> {
        if self.matchup_id.trim().is_empty() {
            return Err(DuelError::InvalidInput("matchup id is required".into()));
        }
        if self.bettor.trim().is_empty() {
            return Err(DuelError::InvalidInput("bettor address is required".into()));
        }
        if self.amount <= 0 {
            return Err(DuelError::InvalidInput(format!(
                "bet amount must be positive, got {}",
                self.amount
            )));
        }
        if !self.odds.is_finite() || self.odds <= 0.0 {
            return Err(DuelError::InvalidInput(format!(
                "odds must be a positive number, got {}",
                self.odds
            )));
        }
        Ok(())
    }
}

/// A recorded bet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bet {
    pub id: i64,
    pub matchup_id: String,
    pub bettor: String,
    pub predicted: Outcome,
    pub amount: i64,
    pub odds: f64,
    pub txn_ref: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Live bet counts for one matchup, grouped by predicted outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BetAggregate {
    pub home: u64,
    pub away: u64,
    pub draw: u64,
    pub total: u64,
}

impl BetAggregate {
    pub fn new(home: u64, away: u64, draw: u64) -> Self {
        Self {
            home,
            away,
            draw,
            total: home + away + draw,
        }
    }

    pub fn count(&self, outcome: Outcome) -> u64 {
        match outcome {
            Outcome::Home => self.home,
            Outcome::Away => self.away,
            Outcome::Draw => self.draw,
        }
    }
}

// ---------------------------------------------------------------------------
// Reference data
// ---------------------------------------------------------------------------

/// A Premier League club.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Team {
    pub id: i64,
    pub code: i64,
    pub name: String,
    pub short_name: String,
    pub strength: i64,
    pub updated_at: DateTime<Utc>,
}

/// A Premier League player (subset of the FPL element record).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Player {
    pub id: i64,
    pub code: i64,
    pub name: String,
    pub web_name: String,
    pub team_id: i64,
    pub team_code: i64,
    pub element_type: i64,
    pub total_points: i64,
    pub form: String,
    pub photo: Option<String>,
    pub news: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Reference data pulled from the FPL bootstrap endpoint.
#[derive(Debug, Clone, Default)]
pub struct BootstrapData {
    pub teams: Vec<Team>,
    pub players: Vec<Player>,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain error returned by every core operation.
#[derive(Debug, thiserror::Error)]
pub enum DuelError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid pool size: expected {expected} ranked entries, got {actual}")]
    InvalidPoolSize { expected: usize, actual: usize },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Upstream unavailable ({source_name}): {message}")]
    Upstream { source_name: String, message: String },

    #[error("Ranking fetch failed: {0}")]
    RankingFetchFailed(String),

    #[error("Gameweek resolution failed: {0}")]
    GameweekResolutionFailed(String),

    #[error("Contract provisioning failed for matchup {matchup_id}: {message}")]
    ContractProvisioningFailed { matchup_id: String, message: String },

    #[error("Persistence failed: {0}")]
    Persistence(String),

    #[error("Timed out after {secs}s: {operation}")]
    Timeout { operation: String, secs: u64 },

    #[error("Cancelled during {0}")]
    Cancelled(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl DuelError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, DuelError::NotFound(_))
    }

    /// Failures caused by an external collaborator rather than by us.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            DuelError::Upstream { .. }
                | DuelError::RankingFetchFailed(_)
                | DuelError::GameweekResolutionFailed(_)
                | DuelError::ContractProvisioningFailed { .. }
                | DuelError::Timeout { .. }
        )
    }
}

impl From<sqlx::Error> for DuelError {
    fn from(err: sqlx::Error) -> Self {
        DuelError::Persistence(err.to_string())
    }
}

pub type DuelResult<T> = std::result::Result<T, DuelError>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
