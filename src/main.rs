//! FPL Duel backend
//!
//! Entry point. Loads configuration, initialises structured logging,
//! opens the database, wires the FPL and deployer clients into the
//! generation pipeline and serves the HTTP API until Ctrl+C.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info};

use fplduel::api::{self, ApiState};
use fplduel::config::AppConfig;
use fplduel::engine::generator::wait_for_shutdown;
use fplduel::engine::{GeneratorConfig, MatchupGenerator, ReferenceRefresher};
use fplduel::sources::deployer::ContractDeployer;
use fplduel::sources::fpl::FplClient;
use fplduel::storage::{Database, MatchupStore};
use fplduel::types::DuelError;

const BANNER: &str = r#"
  _____ ____  _       ____              _
 |  ___|  _ \| |     |  _ \ _   _  ___| |
 | |_  | |_) | |     | | | | | | |/ _ \ |
 |  _| |  __/| |___  | |_| | |_| |  __/ |
 |_|   |_|   |_____| |____/ \__,_|\___|_|

  Head-to-head matchups and betting backend
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let config_path = std::env::var("FPLDUEL_CONFIG").unwrap_or_else(|_| "config.toml".into());
    let cfg = AppConfig::load(&config_path)?;

    init_logging();

    println!("{BANNER}");
    info!(
        config = %config_path,
        pool_size = cfg.generation.pool_size,
        betting_window_secs = cfg.generation.betting_window_secs,
        "FPL Duel starting up"
    );

    // -- Storage ---------------------------------------------------------

    let db = Database::connect(
        &cfg.database_url(),
        cfg.database.max_connections,
        Duration::from_secs(cfg.database.acquire_timeout_secs),
    )
    .await?;
    let matchups: Arc<dyn MatchupStore> = Arc::new(db.matchups());

    // -- Upstream clients ------------------------------------------------

    let fpl = Arc::new(
        FplClient::new(&cfg.fpl.base_url, Duration::from_secs(cfg.fpl.request_timeout_secs))?
            .with_picks_timeout(Duration::from_secs(cfg.fpl.picks_timeout_secs)),
    );
    let deployer = Arc::new(ContractDeployer::new(
        cfg.deployer_url(),
        Duration::from_secs(cfg.deployer.request_timeout_secs),
    )?);

    // -- Engine ----------------------------------------------------------

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let generator = Arc::new(
        MatchupGenerator::new(
            fpl.clone(),
            fpl.clone(),
            deployer,
            matchups.clone(),
            GeneratorConfig::from_app(&cfg),
        )
        .with_shutdown(shutdown_rx.clone()),
    );

    let state = Arc::new(ApiState {
        generator: generator.clone(),
        matchups,
        bets: db.bets(),
        teams: db.teams(),
        players: db.players(),
        refresher: ReferenceRefresher::new(fpl.clone(), db.teams(), db.players()),
        reference: fpl,
    });

    if let Some(secs) = cfg.generation.auto_interval_secs {
        tokio::spawn(run_schedule(
            generator,
            Duration::from_secs(secs),
            shutdown_rx.clone(),
        ));
    }

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            return;
        }
        info!("Shutdown signal received.");
        let _ = shutdown_tx.send(true);
    });

    // -- Serve -----------------------------------------------------------

    let mut server_shutdown = shutdown_rx;
    api::serve(state, &cfg.server, async move {
        wait_for_shutdown(&mut server_shutdown).await;
    })
    .await?;

    db.pool().close().await;
    info!("FPL Duel shut down cleanly.");
    Ok(())
}

/// Run a generation cycle on every tick until shutdown.
async fn run_schedule(
    generator: Arc<MatchupGenerator>,
    every: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(every);
    // The first tick completes immediately; wait a full period instead.
    interval.tick().await;

    info!(interval_secs = every.as_secs(), "Scheduled generation enabled");

    loop {
        tokio::select! {
            _ = interval.tick() => {
                match generator.generate().await {
                    Ok(report) => info!(report = %report, "Scheduled generation finished"),
                    Err(DuelError::Cancelled(_)) => break,
                    Err(e) => error!(error = %e, "Scheduled generation failed, continuing to next"),
                }
            }
            _ = wait_for_shutdown(&mut shutdown) => break,
        }
    }

    info!("Scheduled generation stopped");
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("fplduel=info,tower_http=info"));

    let json_logging = std::env::var("FPLDUEL_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
