//! Mock collaborators for integration testing.
//!
//! Deterministic, in-memory implementations of the ranking, gameweek and
//! deployer traits, plus a matchup store wrapper that can be told to fail
//! specific inserts.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use fplduel::sources::{ContractProvisioner, GameweekResolver, RankingSource};
use fplduel::storage::{MatchupStore, SqliteMatchupStore};
use fplduel::types::*;

/// `n` ranked entries with entry ids `1001..=1000 + n`.
pub fn ranked_pool(n: usize) -> Vec<RankedEntity> {
    (1..=n as i64)
        .map(|id| RankedEntity {
            entry_id: 1000 + id,
            name: format!("Valuable XI #{id}"),
            manager_name: format!("Manager {id}"),
            value: 1100 - id,
            transfers: 20 + id,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Ranking
// ---------------------------------------------------------------------------

pub struct MockRanking {
    entities: Vec<RankedEntity>,
    force_error: Mutex<Option<String>>,
    calls: AtomicUsize,
}

impl MockRanking {
    pub fn new(entities: Vec<RankedEntity>) -> Self {
        Self {
            entities,
            force_error: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    /// Force all subsequent fetches to fail.
    pub fn set_error(&self, msg: &str) {
        *self.force_error.lock().unwrap() = Some(msg.to_string());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RankingSource for MockRanking {
    async fn fetch_top_ranked(&self, n: usize) -> Result<Vec<RankedEntity>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(msg) = self.force_error.lock().unwrap().clone() {
            return Err(anyhow!(msg));
        }
        Ok(self.entities.iter().take(n).cloned().collect())
    }
}

// ---------------------------------------------------------------------------
// Gameweek
// ---------------------------------------------------------------------------

pub struct FixedGameweek(pub i64);

#[async_trait]
impl GameweekResolver for FixedGameweek {
    async fn current_gameweek(&self) -> Result<i64> {
        Ok(self.0)
    }
}

// ---------------------------------------------------------------------------
// Deployer
// ---------------------------------------------------------------------------

/// Records every deployment; optionally fails the n-th call (1-based).
pub struct MockDeployer {
    fail_on_call: Option<usize>,
    calls: AtomicUsize,
    deployed: Mutex<Vec<(PoolParams, DateTime<Utc>)>>,
}

impl MockDeployer {
    pub fn new() -> Self {
        Self {
            fail_on_call: None,
            calls: AtomicUsize::new(0),
            deployed: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_on(call: usize) -> Self {
        Self {
            fail_on_call: Some(call),
            ..Self::new()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn deployments(&self) -> Vec<(PoolParams, DateTime<Utc>)> {
        self.deployed.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContractProvisioner for MockDeployer {
    async fn provision(&self, pools: &PoolParams, deadline: DateTime<Utc>) -> Result<String> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on_call == Some(call) {
            return Err(anyhow!("Contract deployment server returned status 500"));
        }
        self.deployed.lock().unwrap().push((pools.clone(), deadline));
        Ok(format!("0x{call:040x}"))
    }
}

// ---------------------------------------------------------------------------
// Matchup store
// ---------------------------------------------------------------------------

/// Delegates to SQLite but fails the listed create calls (1-based).
pub struct FlakyStore {
    inner: SqliteMatchupStore,
    fail_creates: Vec<usize>,
    creates: AtomicUsize,
}

impl FlakyStore {
    pub fn new(inner: SqliteMatchupStore, fail_creates: Vec<usize>) -> Self {
        Self {
            inner,
            fail_creates,
            creates: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl MatchupStore for FlakyStore {
    async fn create(&self, draft: &NewMatchup) -> DuelResult<Matchup> {
        let call = self.creates.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_creates.contains(&call) {
            return Err(DuelError::Persistence("database is locked".into()));
        }
        self.inner.create(draft).await
    }

    async fn get_by_id(&self, id: &str) -> DuelResult<Option<Matchup>> {
        self.inner.get_by_id(id).await
    }

    async fn list_all(&self) -> DuelResult<Vec<Matchup>> {
        self.inner.list_all().await
    }

    async fn list_by_gameweek(&self, gameweek: i64) -> DuelResult<Vec<Matchup>> {
        self.inner.list_by_gameweek(gameweek).await
    }

    async fn update_score(&self, home_score: i64, away_score: i64, id: &str) -> DuelResult<Matchup> {
        self.inner.update_score(home_score, away_score, id).await
    }

    async fn attach_contract(&self, id: &str, address: &str) -> DuelResult<Matchup> {
        self.inner.attach_contract(id, address).await
    }
}
