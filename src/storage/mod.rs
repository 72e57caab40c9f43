//! Persistence layer.
//!
//! SQLite via `sqlx`, schema managed by the migrations in `./migrations`.
//! Each store wraps a clone of the shared pool:
//! - `SqliteMatchupStore`: matchups (behind the `MatchupStore` trait so
//!   the generation pipeline can run against a mock)
//! - `BetLedger`: bets and live outcome aggregates
//! - `TeamStore` / `PlayerStore`: reference data with transactional
//!   bulk upserts

pub mod bets;
pub mod matchups;
pub mod players;
pub mod teams;

pub use bets::BetLedger;
pub use matchups::{MatchupStore, SqliteMatchupStore};
pub use players::PlayerStore;
pub use teams::TeamStore;

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Shared connection pool plus schema bootstrap.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if needed) the database at `url` and run migrations.
    pub async fn connect(url: &str, max_connections: u32, acquire_timeout: Duration) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .with_context(|| format!("Invalid database URL: {url}"))?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to connect to database: {url}"))?;

        let db = Self { pool };
        db.migrate().await?;
        info!(url, max_connections, "Database ready");
        Ok(db)
    }

    /// Fresh in-memory database for tests.
    ///
    /// Pinned to a single connection that is never recycled, otherwise
    /// each new connection would see an empty database.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .context("Failed to open in-memory database")?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn matchups(&self) -> SqliteMatchupStore {
        SqliteMatchupStore::new(self.pool.clone())
    }

    pub fn bets(&self) -> BetLedger {
        BetLedger::new(self.pool.clone())
    }

    pub fn teams(&self) -> TeamStore {
        TeamStore::new(self.pool.clone())
    }

    pub fn players(&self) -> PlayerStore {
        PlayerStore::new(self.pool.clone())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
