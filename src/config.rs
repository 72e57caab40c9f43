//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Values that differ per deployment (database URL, upstream hosts) may
//! be overridden by naming an env var in the config; the variable is
//! resolved at runtime via `std::env::var`.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::fs;
use std::time::Duration;

use crate::types::{DuelError, PoolParams};

/// Longest accepted betting window: one year.
pub const MAX_BETTING_WINDOW_SECS: i64 = 365 * 24 * 60 * 60;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub fpl: FplConfig,
    pub deployer: DeployerConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub retry: RetryConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// CORS origins. Empty means any origin.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    /// Env var that, when set, overrides `url`.
    #[serde(default)]
    pub url_env: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FplConfig {
    #[serde(default = "default_fpl_base_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Fixed timeout for the manager picks proxy.
    #[serde(default = "default_picks_timeout_secs")]
    pub picks_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DeployerConfig {
    pub base_url: String,
    #[serde(default)]
    pub base_url_env: Option<String>,
    #[serde(default = "default_deploy_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    /// Number of ranked entries paired per cycle. Must be even.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
    /// Betting deadline relative to the start of a cycle.
    #[serde(default = "default_betting_window_secs")]
    pub betting_window_secs: i64,
    #[serde(default = "default_pool_home")]
    pub virtual_pool_home: Decimal,
    #[serde(default = "default_pool_draw")]
    pub virtual_pool_draw: Decimal,
    #[serde(default = "default_pool_away")]
    pub virtual_pool_away: Decimal,
    /// Timeout applied to each provisioning and storage call in a cycle.
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,
    /// Fixed shuffle seed. Leave unset in production.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Run a generation cycle on this interval in addition to on demand.
    #[serde(default)]
    pub auto_interval_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetryConfig {
    /// Attempts for ranking and gameweek reads (provisioning never retries).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

fn default_fpl_base_url() -> String { crate::sources::fpl::DEFAULT_BASE_URL.to_string() }
fn default_max_connections() -> u32 { 5 }
fn default_acquire_timeout_secs() -> u64 { 5 }
fn default_request_timeout_secs() -> u64 { 15 }
fn default_picks_timeout_secs() -> u64 { 10 }
fn default_deploy_timeout_secs() -> u64 { 60 }
fn default_pool_size() -> usize { 10 }
fn default_betting_window_secs() -> i64 { 2 * 60 * 60 }
fn default_pool_home() -> Decimal { dec!(100) }
fn default_pool_draw() -> Decimal { dec!(50) }
fn default_pool_away() -> Decimal { dec!(100) }
fn default_call_timeout_secs() -> u64 { 90 }
fn default_max_attempts() -> u32 { 3 }
fn default_backoff_ms() -> u64 { 500 }

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            pool_size: default_pool_size(),
            betting_window_secs: default_betting_window_secs(),
            virtual_pool_home: default_pool_home(),
            virtual_pool_draw: default_pool_draw(),
            virtual_pool_away: default_pool_away(),
            call_timeout_secs: default_call_timeout_secs(),
            seed: None,
            auto_interval_secs: None,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

impl GenerationConfig {
    pub fn pools(&self) -> PoolParams {
        PoolParams {
            home: self.virtual_pool_home,
            draw: self.virtual_pool_draw,
            away: self.virtual_pool_away,
        }
    }

    /// Clamped to `1..=MAX_BETTING_WINDOW_SECS` for configs built without `validate()`.
    pub fn betting_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.betting_window_secs.clamp(1, MAX_BETTING_WINDOW_SECS))
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }
}

fn invalid(message: String) -> Result<()> {
    Err(DuelError::Config(message).into())
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the generation pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        let g = &self.generation;
        if g.pool_size < 2 || g.pool_size % 2 != 0 {
            return invalid(format!(
                "generation.pool_size must be an even number >= 2, got {}",
                g.pool_size
            ));
        }
        if g.betting_window_secs <= 0 || g.betting_window_secs > MAX_BETTING_WINDOW_SECS {
            return invalid(format!(
                "generation.betting_window_secs must be between 1 and {MAX_BETTING_WINDOW_SECS}, got {}",
                g.betting_window_secs
            ));
        }
        if g.virtual_pool_home <= Decimal::ZERO
            || g.virtual_pool_draw <= Decimal::ZERO
            || g.virtual_pool_away <= Decimal::ZERO
        {
            return invalid("generation virtual pools must all be positive".into());
        }
        if g.call_timeout_secs == 0 {
            return invalid("generation.call_timeout_secs must be positive".into());
        }
        if g.auto_interval_secs == Some(0) {
            return invalid("generation.auto_interval_secs must be positive when set".into());
        }
        if self.retry.max_attempts == 0 {
            return invalid("retry.max_attempts must be at least 1".into());
        }
        Ok(())
    }

    /// Database URL, honouring the `url_env` override.
    pub fn database_url(&self) -> String {
        self.database
            .url_env
            .as_deref()
            .and_then(|env| Self::resolve_env(env).ok())
            .unwrap_or_else(|| self.database.url.clone())
    }

    /// Contract deployer base URL, honouring the `base_url_env` override.
    pub fn deployer_url(&self) -> String {
        self.deployer
            .base_url_env
            .as_deref()
            .and_then(|env| Self::resolve_env(env).ok())
            .unwrap_or_else(|| self.deployer.base_url.clone())
    }

    /// Resolve an environment variable name to its value.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }
}
