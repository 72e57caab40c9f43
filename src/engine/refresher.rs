//! Reference-data refresh: pulls the FPL bootstrap feed and bulk-upserts
//! teams or players.

use std::sync::Arc;
use tracing::info;

use crate::sources::ReferenceSource;
use crate::storage::{PlayerStore, TeamStore};
use crate::types::{BootstrapData, DuelError, DuelResult};

pub struct ReferenceRefresher {
    source: Arc<dyn ReferenceSource>,
    teams: TeamStore,
    players: PlayerStore,
}

impl ReferenceRefresher {
    pub fn new(source: Arc<dyn ReferenceSource>, teams: TeamStore, players: PlayerStore) -> Self {
        Self {
            source,
            teams,
            players,
        }
    }

    async fn bootstrap(&self) -> DuelResult<BootstrapData> {
        self.source.fetch_bootstrap().await.map_err(|e| DuelError::Upstream {
            source_name: "fpl bootstrap".into(),
            message: format!("{e:#}"),
        })
    }

    /// Returns the number of teams written.
    pub async fn refresh_teams(&self) -> DuelResult<usize> {
        let data = self.bootstrap().await?;
        let written = self.teams.bulk_upsert(&data.teams).await?;
        info!(written, "Team reference data refreshed");
        Ok(written)
    }

    /// Returns the number of players written.
    pub async fn refresh_players(&self) -> DuelResult<usize> {
        let data = self.bootstrap().await?;
        let written = self.players.bulk_upsert(&data.players).await?;
        info!(written, "Player reference data refreshed");
        Ok(written)
    }
}
