//! Matchup generation pipeline.
//!
//! One cycle: fetch the ranked pool, resolve the gameweek, pair, persist
//! each pair, then provision a betting contract per persisted matchup.
//!
//! Failure policy differs per step. Ranking, gameweek and pairing errors
//! abort the cycle before anything is written. A pair that fails to
//! persist is counted and skipped. A provisioning failure aborts the
//! cycle, leaving already-provisioned matchups in place. A create that
//! times out after SQLite has committed it leaves an orphan row that is
//! counted as failed and never provisioned.
//!
//! Steps run strictly in order. Every external call runs under the
//! configured call timeout and observes the shutdown signal, if one was
//! supplied.

use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

use super::pairing::pair_entities;
use crate::config::AppConfig;
use crate::sources::retry::RetryPolicy;
use crate::sources::{ContractProvisioner, GameweekResolver, RankingSource};
use crate::storage::MatchupStore;
use crate::types::{
    DuelError, DuelResult, GenerationReport, Matchup, NewMatchup, Pairing, PoolParams, RankedEntity,
};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub pool_size: usize,
    pub betting_window: chrono::Duration,
    pub pools: PoolParams,
    pub call_timeout: Duration,
    /// Applied to the ranking and gameweek reads only.
    pub retry: RetryPolicy,
    pub seed: Option<u64>,
}

impl GeneratorConfig {
    pub fn from_app(cfg: &AppConfig) -> Self {
        let g = &cfg.generation;
        Self {
            pool_size: g.pool_size,
            betting_window: g.betting_window(),
            pools: g.pools(),
            call_timeout: g.call_timeout(),
            retry: RetryPolicy::new(&cfg.retry, g.call_timeout()),
            seed: g.seed,
        }
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        let call_timeout = Duration::from_secs(90);
        Self {
            pool_size: 10,
            betting_window: chrono::Duration::hours(2),
            pools: PoolParams::default(),
            call_timeout,
            retry: RetryPolicy::once(call_timeout),
            seed: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Generator
// ---------------------------------------------------------------------------

pub struct MatchupGenerator {
    ranking: Arc<dyn RankingSource>,
    gameweeks: Arc<dyn GameweekResolver>,
    provisioner: Arc<dyn ContractProvisioner>,
    store: Arc<dyn MatchupStore>,
    config: GeneratorConfig,
    rng: Mutex<ChaCha8Rng>,
    shutdown: Option<watch::Receiver<bool>>,
}

impl MatchupGenerator {
    pub fn new(
        ranking: Arc<dyn RankingSource>,
        gameweeks: Arc<dyn GameweekResolver>,
        provisioner: Arc<dyn ContractProvisioner>,
        store: Arc<dyn MatchupStore>,
        config: GeneratorConfig,
    ) -> Self {
        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self {
            ranking,
            gameweeks,
            provisioner,
            store,
            config,
            rng: Mutex::new(rng),
            shutdown: None,
        }
    }

    /// Abort in-flight cycles once `true` is published on this channel.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Resolve the gameweek new matchups belong to, with bounded retry.
    pub async fn current_gameweek(&self) -> DuelResult<i64> {
        self.cancellable("gameweek resolution", async {
            self.config
                .retry
                .run("gameweek resolution", || self.gameweeks.current_gameweek())
                .await
                .map_err(|e| DuelError::GameweekResolutionFailed(format!("{e:#}")))
        })
        .await
    }

    /// Run one generation cycle.
    pub async fn generate(&self) -> DuelResult<GenerationReport> {
        let invoked_at = Utc::now();
        let deadline = invoked_at
            .checked_add_signed(self.config.betting_window)
            .ok_or_else(|| {
                DuelError::Config(format!(
                    "betting window of {}s overflows the deadline",
                    self.config.betting_window.num_seconds()
                ))
            })?;
        info!(pool_size = self.config.pool_size, betting_end = %deadline, "Starting matchup generation");

        // 1. Ranked pool
        let entities = self.fetch_pool().await?;

        // 2. Gameweek
        let gameweek = self.current_gameweek().await?;

        // 3. Pairing
        let pairs = self.pair(entities)?;

        // 4. Persist, tolerating per-pair failure
        let (mut created, failed) = self.persist_pairs(&pairs, gameweek).await?;

        // 5. Provision, aborting on the first failure
        for matchup in created.iter_mut() {
            *matchup = self.provision(matchup, deadline).await?;
        }

        let report = GenerationReport {
            gameweek,
            created,
            failed,
        };
        info!(
            gameweek,
            created = report.created.len(),
            provisioned = report.provisioned(),
            failed,
            "Matchup generation complete"
        );
        Ok(report)
    }

    async fn fetch_pool(&self) -> DuelResult<Vec<RankedEntity>> {
        let n = self.config.pool_size;
        let entities = self
            .cancellable("ranking fetch", async {
                self.config
                    .retry
                    .run("ranking fetch", || self.ranking.fetch_top_ranked(n))
                    .await
                    .map_err(|e| DuelError::RankingFetchFailed(format!("{e:#}")))
            })
            .await?;

        if entities.len() != n {
            return Err(DuelError::InvalidPoolSize {
                expected: n,
                actual: entities.len(),
            });
        }
        Ok(entities)
    }

    fn pair(&self, entities: Vec<RankedEntity>) -> DuelResult<Vec<Pairing>> {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        pair_entities(entities, self.config.pool_size, &mut *rng)
    }

    async fn persist_pairs(
        &self,
        pairs: &[Pairing],
        gameweek: i64,
    ) -> DuelResult<(Vec<Matchup>, usize)> {
        let mut created = Vec::with_capacity(pairs.len());
        let mut failed = 0;

        for (idx, pair) in pairs.iter().enumerate() {
            let draft = NewMatchup::from_pairing(pair, gameweek);
            let result = self
                .cancellable("matchup persistence", self.timed("matchup persistence", self.store.create(&draft)))
                .await;

            match result {
                Ok(matchup) => created.push(matchup),
                Err(e @ DuelError::Cancelled(_)) => return Err(e),
                Err(e) => {
                    failed += 1;
                    warn!(
                        pair = idx,
                        home = pair.home.entry_id,
                        away = pair.away.entry_id,
                        gameweek,
                        error = %e,
                        "Failed to persist matchup, skipping pair"
                    );
                }
            }
        }

        Ok((created, failed))
    }

    async fn provision(&self, matchup: &Matchup, deadline: DateTime<Utc>) -> DuelResult<Matchup> {
        let deployed = self
            .cancellable(
                "contract provisioning",
                self.timed(
                    "contract provisioning",
                    async {
                        self.provisioner
                            .provision(&self.config.pools, deadline)
                            .await
                            .map_err(|e| DuelError::Upstream {
                                source_name: "contract deployer".into(),
                                message: format!("{e:#}"),
                            })
                    },
                ),
            )
            .await;

        let address = match deployed {
            Ok(address) => address,
            Err(e @ DuelError::Cancelled(_)) => return Err(e),
            Err(e) => {
                return Err(DuelError::ContractProvisioningFailed {
                    matchup_id: matchup.id.clone(),
                    message: e.to_string(),
                })
            }
        };

        // Not cancellable: the contract already exists.
        let updated = self
            .timed("contract attachment", self.store.attach_contract(&matchup.id, &address))
            .await
            .map_err(|e| {
                DuelError::Persistence(format!(
                    "contract {address} deployed for matchup {} but not recorded: {e}",
                    matchup.id
                ))
            })?;

        info!(matchup = %updated.id, address = %address, "Matchup provisioned");
        Ok(updated)
    }

    async fn timed<T, F>(&self, operation: &str, fut: F) -> DuelResult<T>
    where
        F: Future<Output = DuelResult<T>>,
    {
        match tokio::time::timeout(self.config.call_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(DuelError::Timeout {
                operation: operation.to_string(),
                secs: self.config.call_timeout.as_secs(),
            }),
        }
    }

    async fn cancellable<T, F>(&self, operation: &str, fut: F) -> DuelResult<T>
    where
        F: Future<Output = DuelResult<T>>,
    {
        let Some(mut shutdown) = self.shutdown.clone() else {
            return fut.await;
        };
        let stopped = *shutdown.borrow();
        if stopped {
            return Err(DuelError::Cancelled(operation.to_string()));
        }

        tokio::select! {
            result = fut => result,
            _ = wait_for_shutdown(&mut shutdown) => Err(DuelError::Cancelled(operation.to_string())),
        }
    }
}

/// Resolves once `true` is published. Never resolves if the sender is gone.
pub async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
