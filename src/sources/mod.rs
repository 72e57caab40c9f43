//! External collaborators.
//!
//! Defines the narrow async traits the core consumes and the concrete
//! HTTP clients implementing them:
//! - `FplClient`: ranking, gameweek status, bootstrap reference data
//!   and the manager picks proxy
//! - `ContractDeployer`: betting contract deployment service

pub mod deployer;
pub mod fpl;
pub mod retry;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::types::{BootstrapData, PoolParams, RankedEntity};

/// Source of the current top-ranked entries.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RankingSource: Send + Sync {
    /// Fetch at most `n` entries, best ranked first.
    async fn fetch_top_ranked(&self, n: usize) -> Result<Vec<RankedEntity>>;
}

/// Resolves the gameweek new matchups belong to.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GameweekResolver: Send + Sync {
    async fn current_gameweek(&self) -> Result<i64>;
}

/// Deploys one betting contract per matchup.
///
/// Calls have an external side effect, so callers must never retry them
/// blindly.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContractProvisioner: Send + Sync {
    /// Returns the deployed contract address.
    async fn provision(&self, pools: &PoolParams, deadline: DateTime<Utc>) -> Result<String>;
}

/// Reference data and pass-through lookups against the FPL API.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReferenceSource: Send + Sync {
    async fn fetch_bootstrap(&self) -> Result<BootstrapData>;

    /// Raw picks of one manager for one gameweek.
    async fn fetch_manager_picks(&self, entry_id: i64, gameweek: i64) -> Result<serde_json::Value>;
}
