//! Betting contract deployment service client.
//!
//! The deployer is a small companion service that owns the operator
//! wallet and deploys one matchup betting contract per request.
//!
//! Endpoint: `POST {base}/create`
//! Body: `{virtualPoolA, virtualPoolDraw, virtualPoolB, bettingEndTimestamp}`
//! with pools in whole HBAR as decimal strings and the deadline in unix
//! seconds. Replies 200 or 201 with `{success, contractAddress, ...}`.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use super::ContractProvisioner;
use crate::types::PoolParams;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeploymentRequest {
    virtual_pool_a: String,
    virtual_pool_draw: String,
    virtual_pool_b: String,
    betting_end_timestamp: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeploymentResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    contract_address: String,
    #[serde(default)]
    transaction_hash: String,
    #[serde(default)]
    message: String,
}

pub struct ContractDeployer {
    http: Client,
    base_url: String,
}

impl ContractDeployer {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client for contract deployer")?;
        Ok(Self::with_client(http, base_url))
    }

    pub fn with_client(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ContractProvisioner for ContractDeployer {
    async fn provision(&self, pools: &PoolParams, deadline: DateTime<Utc>) -> Result<String> {
        let url = format!("{}/create", self.base_url);
        let body = DeploymentRequest {
            virtual_pool_a: pools.home.normalize().to_string(),
            virtual_pool_draw: pools.draw.normalize().to_string(),
            virtual_pool_b: pools.away.normalize().to_string(),
            betting_end_timestamp: deadline.timestamp(),
        };
        debug!(url = %url, ?body, "Requesting contract deployment");

        let resp = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .context("Failed to call contract deployment server")?;

        let status = resp.status();
        if status != StatusCode::OK && status != StatusCode::CREATED {
            bail!("Contract deployment server returned status {status}");
        }

        let parsed: DeploymentResponse = resp
            .json()
            .await
            .context("Failed to parse deployment response")?;

        if !parsed.success {
            return Err(anyhow!("Contract deployment failed: {}", parsed.message));
        }
        if parsed.contract_address.is_empty() {
            bail!("Contract deployment succeeded without a contract address");
        }

        info!(
            address = %parsed.contract_address,
            tx = %parsed.transaction_hash,
            betting_end = %deadline,
            "Betting contract deployed"
        );
        Ok(parsed.contract_address)
    }
}
