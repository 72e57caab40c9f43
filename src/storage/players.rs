//! Premier League players and their headshot URLs.

use sqlx::sqlite::SqlitePool;
use tracing::info;

use crate::types::{DuelResult, Player};

/// Headshots are served as `{base}{code}.png`.
pub const PLAYER_IMAGE_BASE_URL: &str =
    "https://resources.premierleague.com/premierleague25/photos/players/110x140/";

const SELECT_PLAYER: &str = r"
    SELECT id, code, name, web_name, team_id, team_code, element_type,
           total_points, form, photo, news, updated_at
    FROM players
";

#[derive(Clone)]
pub struct PlayerStore {
    pool: SqlitePool,
}

impl PlayerStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, id: i64) -> DuelResult<Option<Player>> {
        let player = sqlx::query_as::<_, Player>(&format!("{SELECT_PLAYER} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(player)
    }

    pub async fn get_by_code(&self, code: i64) -> DuelResult<Option<Player>> {
        let player = sqlx::query_as::<_, Player>(&format!("{SELECT_PLAYER} WHERE code = ?1"))
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;
        Ok(player)
    }

    /// Headshot URL for the player with this code, if they exist and have a photo.
    pub async fn image_url(&self, code: i64) -> DuelResult<Option<String>> {
        let url = self
            .get_by_code(code)
            .await?
            .filter(|p| p.photo.as_deref().is_some_and(|photo| !photo.is_empty()))
            .map(|p| format!("{PLAYER_IMAGE_BASE_URL}{}.png", p.code));
        Ok(url)
    }

    /// Insert or update every player in one transaction.
    pub async fn bulk_upsert(&self, players: &[Player]) -> DuelResult<usize> {
        let mut tx = self.pool.begin().await?;

        for p in players {
            sqlx::query(
                r"
                INSERT INTO players (id, code, name, web_name, team_id, team_code, element_type,
                                     total_points, form, photo, news, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                ON CONFLICT(id) DO UPDATE SET
                    code = excluded.code,
                    name = excluded.name,
                    web_name = excluded.web_name,
                    team_id = excluded.team_id,
                    team_code = excluded.team_code,
                    element_type = excluded.element_type,
                    total_points = excluded.total_points,
                    form = excluded.form,
                    photo = excluded.photo,
                    news = excluded.news,
                    updated_at = excluded.updated_at
                ",
            )
            .bind(p.id)
            .bind(p.code)
            .bind(&p.name)
            .bind(&p.web_name)
            .bind(p.team_id)
            .bind(p.team_code)
            .bind(p.element_type)
            .bind(p.total_points)
            .bind(&p.form)
            .bind(&p.photo)
            .bind(&p.news)
            .bind(p.updated_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        info!(count = players.len(), "Players upserted");
        Ok(players.len())
    }
}
