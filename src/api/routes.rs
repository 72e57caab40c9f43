//! HTTP route handlers.
//!
//! Thin adapters over the core: decode the request, call one operation,
//! wrap the result in a JSON envelope. Errors go through [`ApiError`].

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, warn};

use crate::engine::{MatchupGenerator, ReferenceRefresher};
use crate::sources::ReferenceSource;
use crate::storage::{BetLedger, MatchupStore, PlayerStore, TeamStore};
use crate::types::{BetAggregate, DuelError, NewBet, Outcome};

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Everything the handlers need, shared behind an `Arc`.
pub struct ApiState {
    pub generator: Arc<MatchupGenerator>,
    pub matchups: Arc<dyn MatchupStore>,
    pub bets: BetLedger,
    pub teams: TeamStore,
    pub players: PlayerStore,
    pub refresher: ReferenceRefresher,
    pub reference: Arc<dyn ReferenceSource>,
}

pub type AppState = Arc<ApiState>;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// `DuelError` rendered as an HTTP response.
///
/// 4xx bodies carry the error text; 5xx bodies carry a generic message and
/// the detail goes to the log only.
#[derive(Debug)]
pub struct ApiError(pub DuelError);

impl From<DuelError> for ApiError {
    fn from(err: DuelError) -> Self {
        Self(err)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            DuelError::NotFound(_) => StatusCode::NOT_FOUND,
            DuelError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            DuelError::Cancelled(_) => StatusCode::SERVICE_UNAVAILABLE,
            e if e.is_upstream() => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_client_error() {
            self.0.to_string()
        } else {
            error!(status = status.as_u16(), error = %self.0, "Request failed");
            match status {
                StatusCode::BAD_GATEWAY => "upstream service unavailable".to_string(),
                StatusCode::SERVICE_UNAVAILABLE => "server is shutting down".to_string(),
                _ => "internal server error".to_string(),
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct UpdateScoresRequest {
    pub home_score: i64,
    pub away_score: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateBetRequest {
    pub user_address: String,
    pub matchup_id: String,
    /// 0 = home, 1 = away, 2 = draw.
    pub predicted_winner: i64,
    pub bet_amount: i64,
    pub odds: f64,
    pub txn_hash: String,
}

impl TryFrom<CreateBetRequest> for NewBet {
    type Error = DuelError;

    fn try_from(req: CreateBetRequest) -> Result<Self, Self::Error> {
        Ok(NewBet {
            matchup_id: req.matchup_id,
            bettor: req.user_address,
            predicted: Outcome::try_from(req.predicted_winner)?,
            amount: req.bet_amount,
            odds: req.odds,
            txn_ref: req.txn_hash,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct OutcomeCountsResponse {
    pub total_bets: u64,
    pub team_a_bets: u64,
    pub team_b_bets: u64,
    pub draw_bets: u64,
}

impl From<BetAggregate> for OutcomeCountsResponse {
    fn from(agg: BetAggregate) -> Self {
        Self {
            total_bets: agg.total,
            team_a_bets: agg.home,
            team_b_bets: agg.away,
            draw_bets: agg.draw,
        }
    }
}

// ---------------------------------------------------------------------------
// Matchups
// ---------------------------------------------------------------------------

/// POST /matchup
pub async fn create_matchups(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let report = state.generator.generate().await?;
    let pairs = state.generator.config().pool_size / 2;
    Ok(Json(json!({
        "gameweek": report.gameweek,
        "failed": report.failed,
        "message": format!("created {} matchups of {}", report.created.len(), pairs),
        "matchups": report.created,
    })))
}

/// GET /matchup
pub async fn list_matchups(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let matchups = state.matchups.list_all().await?;
    Ok(Json(json!({ "matchups": matchups })))
}

/// GET /matchup/:id
pub async fn get_matchup(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let matchup = state
        .matchups
        .get_by_id(&id)
        .await?
        .ok_or_else(|| DuelError::NotFound("matchup not found".into()))?;
    Ok(Json(json!({ "matchup": matchup })))
}

/// PUT /matchup/:id/score
pub async fn update_score(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateScoresRequest>,
) -> ApiResult<Json<Value>> {
    let matchup = state
        .matchups
        .update_score(req.home_score, req.away_score, &id)
        .await?;
    Ok(Json(json!({
        "message": "matchup scores updated successfully",
        "matchup": matchup,
    })))
}

/// GET /matchup/:id/bets
pub async fn outcome_counts(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<OutcomeCountsResponse>> {
    let agg = state.bets.outcome_counts(&id).await?;
    Ok(Json(agg.into()))
}

/// GET /gameweek
pub async fn current_gameweek(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let gameweek = state.generator.current_gameweek().await?;
    Ok(Json(json!({ "currentGameweek": gameweek })))
}

/// GET /gameweek/:gameweek
pub async fn matchups_by_gameweek(
    State(state): State<AppState>,
    Path(gameweek): Path<i64>,
) -> ApiResult<Json<Value>> {
    if gameweek <= 0 {
        return Err(DuelError::InvalidInput(format!("invalid gameweek {gameweek}")).into());
    }
    let matchups = state.matchups.list_by_gameweek(gameweek).await?;
    Ok(Json(json!({ "matchups": matchups })))
}

// ---------------------------------------------------------------------------
// Bets
// ---------------------------------------------------------------------------

/// POST /bet
pub async fn create_bet(
    State(state): State<AppState>,
    Json(req): Json<CreateBetRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let bet = state.bets.record_bet(NewBet::try_from(req)?).await?;
    Ok((StatusCode::CREATED, Json(json!({ "bet": bet }))))
}

/// GET /bets/:address
pub async fn bets_by_bettor(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> ApiResult<Json<Value>> {
    let bets = state.bets.bets_by_bettor(&address).await?;
    Ok(Json(json!({ "bets": bets })))
}

// ---------------------------------------------------------------------------
// Reference data
// ---------------------------------------------------------------------------

/// POST /update/teams
pub async fn refresh_teams(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let started = Instant::now();
    let count = state.refresher.refresh_teams().await?;
    Ok(Json(json!({
        "message": "Teams created or updated successfully",
        "team_count": count,
        "duration_ms": started.elapsed().as_millis() as u64,
    })))
}

/// GET /team
pub async fn list_teams(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let teams = state.teams.list().await?;
    Ok(Json(json!({ "teams": teams })))
}

/// GET /team/id/:id
pub async fn team_by_id(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let team = state
        .teams
        .get_by_id(id)
        .await?
        .ok_or_else(|| DuelError::NotFound("team not found".into()))?;
    Ok(Json(json!({ "team": team })))
}

/// GET /team/code/:code
pub async fn team_by_code(
    State(state): State<AppState>,
    Path(code): Path<i64>,
) -> ApiResult<Json<Value>> {
    let team = state
        .teams
        .get_by_code(code)
        .await?
        .ok_or_else(|| DuelError::NotFound("team not found".into()))?;
    Ok(Json(json!({ "team": team })))
}

/// POST /update/players
pub async fn refresh_players(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let started = Instant::now();
    let count = state.refresher.refresh_players().await?;
    Ok(Json(json!({
        "message": "Players updated successfully",
        "player_count": count,
        "duration_ms": started.elapsed().as_millis() as u64,
    })))
}

/// GET /player/id/:id
pub async fn player_by_id(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let player = state
        .players
        .get_by_id(id)
        .await?
        .ok_or_else(|| DuelError::NotFound("player not found".into()))?;
    Ok(Json(json!({ "player": player })))
}

/// GET /player/code/:code
pub async fn player_by_code(
    State(state): State<AppState>,
    Path(code): Path<i64>,
) -> ApiResult<Json<Value>> {
    let player = state
        .players
        .get_by_code(code)
        .await?
        .ok_or_else(|| DuelError::NotFound("player not found".into()))?;
    Ok(Json(json!({ "player": player })))
}

/// GET /player/image/:code
pub async fn player_image(
    State(state): State<AppState>,
    Path(code): Path<i64>,
) -> ApiResult<Json<Value>> {
    let url = state
        .players
        .image_url(code)
        .await?
        .ok_or_else(|| DuelError::NotFound("player image not found".into()))?;
    Ok(Json(json!({ "image_url": url })))
}

/// GET /teams/:id/picks/:gameweek
pub async fn manager_picks(
    State(state): State<AppState>,
    Path((entry_id, gameweek)): Path<(i64, i64)>,
) -> ApiResult<Json<Value>> {
    let picks = state
        .reference
        .fetch_manager_picks(entry_id, gameweek)
        .await
        .map_err(|e| {
            warn!(entry_id, gameweek, error = %e, "Manager picks proxy failed");
            DuelError::Upstream {
                source_name: "fpl picks".into(),
                message: format!("{e:#}"),
            }
        })?;
    Ok(Json(picks))
}

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
