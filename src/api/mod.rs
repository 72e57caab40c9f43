//! HTTP surface: Axum server exposing the matchup, bet and reference-data
//! operations as JSON endpoints.
//!
//! CORS is open to any origin unless `server.allowed_origins` lists some.

pub mod routes;

use anyhow::{Context, Result};
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post, put},
    Router,
};
use std::future::Future;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::config::ServerConfig;

pub use routes::{ApiError, ApiState, AppState};

/// Build the Axum router with all routes and middleware.
pub fn build_router(state: AppState, allowed_origins: &[String]) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    let cors = if allowed_origins.is_empty() {
        cors.allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|origin| match origin.parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(origin = %origin, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        cors.allow_origin(origins)
    };

    Router::new()
        .route("/health", get(routes::health))
        // Matchups
        .route("/matchup", post(routes::create_matchups).get(routes::list_matchups))
        .route("/matchup/:id", get(routes::get_matchup))
        .route("/matchup/:id/score", put(routes::update_score))
        .route("/matchup/:id/bets", get(routes::outcome_counts))
        .route("/gameweek", get(routes::current_gameweek))
        .route("/gameweek/:gameweek", get(routes::matchups_by_gameweek))
        // Bets
        .route("/bet", post(routes::create_bet))
        .route("/bets/:address", get(routes::bets_by_bettor))
        // Reference data
        .route("/update/teams", post(routes::refresh_teams))
        .route("/team", get(routes::list_teams))
        .route("/team/id/:id", get(routes::team_by_id))
        .route("/team/code/:code", get(routes::team_by_code))
        .route("/update/players", post(routes::refresh_players))
        .route("/player/id/:id", get(routes::player_by_id))
        .route("/player/code/:code", get(routes::player_by_code))
        .route("/player/image/:code", get(routes::player_image))
        .route("/teams/:id/picks/:gameweek", get(routes::manager_picks))
        .layer(cors)
        .with_state(state)
}

/// Bind and serve until `shutdown` resolves.
pub async fn serve<F>(state: AppState, config: &ServerConfig, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_router(state, &config.allowed_origins);
    let addr = format!("{}:{}", config.host, config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind HTTP server to {addr}"))?;
    info!(addr = %addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server error")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
