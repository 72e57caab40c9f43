//! Premier League clubs, refreshed in bulk from the bootstrap feed.

use sqlx::sqlite::SqlitePool;
use tracing::info;

use crate::types::{DuelResult, Team};

const SELECT_TEAM: &str = "SELECT id, code, name, short_name, strength, updated_at FROM teams";

#[derive(Clone)]
pub struct TeamStore {
    pool: SqlitePool,
}

impl TeamStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, id: i64) -> DuelResult<Option<Team>> {
        let team = sqlx::query_as::<_, Team>(&format!("{SELECT_TEAM} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(team)
    }

    pub async fn get_by_code(&self, code: i64) -> DuelResult<Option<Team>> {
        let team = sqlx::query_as::<_, Team>(&format!("{SELECT_TEAM} WHERE code = ?1"))
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;
        Ok(team)
    }

    pub async fn list(&self) -> DuelResult<Vec<Team>> {
        let teams = sqlx::query_as::<_, Team>(&format!("{SELECT_TEAM} ORDER BY id"))
            .fetch_all(&self.pool)
            .await?;
        Ok(teams)
    }

    /// Insert or update every team in one transaction.
    ///
    /// Any failing row rolls the whole batch back.
    pub async fn bulk_upsert(&self, teams: &[Team]) -> DuelResult<usize> {
        let mut tx = self.pool.begin().await?;

        for team in teams {
            sqlx::query(
                r"
                INSERT INTO teams (id, code, name, short_name, strength, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ON CONFLICT(id) DO UPDATE SET
                    code = excluded.code,
                    name = excluded.name,
                    short_name = excluded.short_name,
                    strength = excluded.strength,
                    updated_at = excluded.updated_at
                ",
            )
            .bind(team.id)
            .bind(team.code)
            .bind(&team.name)
            .bind(&team.short_name)
            .bind(team.strength)
            .bind(team.updated_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        info!(count = teams.len(), "Teams upserted");
        Ok(teams.len())
    }
}
