//! Matchup persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::types::{DuelError, DuelResult, Matchup, MatchupSide, NewMatchup};

/// Create/read/update access to matchups.
///
/// Ids and timestamps are assigned by the store. Lookups of an absent id
/// return `Ok(None)`; only genuine storage failures are errors.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MatchupStore: Send + Sync {
    async fn create(&self, draft: &NewMatchup) -> DuelResult<Matchup>;

    async fn get_by_id(&self, id: &str) -> DuelResult<Option<Matchup>>;

    /// Every matchup, oldest first.
    async fn list_all(&self) -> DuelResult<Vec<Matchup>>;

    /// Matchups of one gameweek, in creation order.
    async fn list_by_gameweek(&self, gameweek: i64) -> DuelResult<Vec<Matchup>>;

    /// Overwrite both scores. `NotFound` if the id does not exist.
    async fn update_score(&self, home_score: i64, away_score: i64, id: &str) -> DuelResult<Matchup>;

    /// Record the deployed betting contract. `NotFound` if the id does not exist.
    async fn attach_contract(&self, id: &str, address: &str) -> DuelResult<Matchup>;
}

#[derive(Debug, sqlx::FromRow)]
struct MatchupRow {
    id: String,
    gameweek: i64,
    home_team_id: i64,
    home_team_name: String,
    home_manager_name: String,
    home_team_value: i64,
    home_team_transfers: i64,
    home_team_score: i64,
    assigned_home: i64,
    away_team_id: i64,
    away_team_name: String,
    away_manager_name: String,
    away_team_value: i64,
    away_team_transfers: i64,
    away_team_score: i64,
    assigned_away: i64,
    contract_address: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<MatchupRow> for Matchup {
    fn from(row: MatchupRow) -> Self {
        Matchup {
            id: row.id,
            home: MatchupSide {
                entry_id: row.home_team_id,
                name: row.home_team_name,
                manager_name: row.home_manager_name,
                value: row.home_team_value,
                transfers: row.home_team_transfers,
                score: row.home_team_score,
            },
            away: MatchupSide {
                entry_id: row.away_team_id,
                name: row.away_team_name,
                manager_name: row.away_manager_name,
                value: row.away_team_value,
                transfers: row.away_team_transfers,
                score: row.away_team_score,
            },
            assigned_home: row.assigned_home,
            assigned_away: row.assigned_away,
            contract_address: row.contract_address,
            gameweek: row.gameweek,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const SELECT_MATCHUP: &str = r"
    SELECT id, gameweek,
           home_team_id, home_team_name, home_manager_name,
           home_team_value, home_team_transfers, home_team_score, assigned_home,
           away_team_id, away_team_name, away_manager_name,
           away_team_value, away_team_transfers, away_team_score, assigned_away,
           contract_address, created_at, updated_at
    FROM matchups
";

/// SQLite-backed [`MatchupStore`].
#[derive(Clone)]
pub struct SqliteMatchupStore {
    pool: SqlitePool,
}

impl SqliteMatchupStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn require(&self, id: &str) -> DuelResult<Matchup> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DuelError::NotFound(format!("matchup {id}")))
    }
}

#[async_trait]
impl MatchupStore for SqliteMatchupStore {
    async fn create(&self, draft: &NewMatchup) -> DuelResult<Matchup> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            r"
            INSERT INTO matchups (
                id, gameweek,
                home_team_id, home_team_name, home_manager_name,
                home_team_value, home_team_transfers, home_team_score, assigned_home,
                away_team_id, away_team_name, away_manager_name,
                away_team_value, away_team_transfers, away_team_score, assigned_away,
                contract_address, created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, NULL, ?17, ?17)
            ",
        )
        .bind(&id)
        .bind(draft.gameweek)
        .bind(draft.home.entry_id)
        .bind(&draft.home.name)
        .bind(&draft.home.manager_name)
        .bind(draft.home.value)
        .bind(draft.home.transfers)
        .bind(draft.home.score)
        .bind(draft.assigned_home)
        .bind(draft.away.entry_id)
        .bind(&draft.away.name)
        .bind(&draft.away.manager_name)
        .bind(draft.away.value)
        .bind(draft.away.transfers)
        .bind(draft.away.score)
        .bind(draft.assigned_away)
        .bind(now)
        .execute(&self.pool)
        .await?;

        debug!(id = %id, gameweek = draft.gameweek, "Matchup created");

        Ok(Matchup {
            id,
            home: draft.home.clone(),
            away: draft.away.clone(),
            assigned_home: draft.assigned_home,
            assigned_away: draft.assigned_away,
            contract_address: None,
            gameweek: draft.gameweek,
            created_at: now,
            updated_at: now,
        })
    }

    async fn get_by_id(&self, id: &str) -> DuelResult<Option<Matchup>> {
        let row = sqlx::query_as::<_, MatchupRow>(&format!("{SELECT_MATCHUP} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Matchup::from))
    }

    async fn list_all(&self) -> DuelResult<Vec<Matchup>> {
        let rows = sqlx::query_as::<_, MatchupRow>(&format!(
            "{SELECT_MATCHUP} ORDER BY created_at, rowid"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Matchup::from).collect())
    }

    async fn list_by_gameweek(&self, gameweek: i64) -> DuelResult<Vec<Matchup>> {
        let rows = sqlx::query_as::<_, MatchupRow>(&format!(
            "{SELECT_MATCHUP} WHERE gameweek = ?1 ORDER BY created_at, rowid"
        ))
        .bind(gameweek)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Matchup::from).collect())
    }

    async fn update_score(&self, home_score: i64, away_score: i64, id: &str) -> DuelResult<Matchup> {
        if home_score < 0 || away_score < 0 {
            return Err(DuelError::InvalidInput(format!(
                "scores must be non-negative, got {home_score}-{away_score}"
            )));
        }

        let result = sqlx::query(
            r"
            UPDATE matchups
            SET home_team_score = ?1, away_team_score = ?2, updated_at = ?3
            WHERE id = ?4
            ",
        )
        .bind(home_score)
        .bind(away_score)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DuelError::NotFound(format!("matchup {id}")));
        }

        info!(id, home_score, away_score, "Matchup score updated");
        self.require(id).await
    }

    async fn attach_contract(&self, id: &str, address: &str) -> DuelResult<Matchup> {
        let result = sqlx::query(
            "UPDATE matchups SET contract_address = ?1, updated_at = ?2 WHERE id = ?3",
        )
        .bind(address)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DuelError::NotFound(format!("matchup {id}")));
        }

        self.require(id).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
