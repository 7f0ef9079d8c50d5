//! Token metadata resolver
//!
//! Resolves a mint's decimal precision through an ordered chain of
//! external sources, degrading to a hard-coded default when every source
//! fails. Precision loss is accepted over blocking the pipeline; callers
//! treat the returned value as advisory.

use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::cache::RequestCache;

/// Returned when every resolver step fails
pub const DEFAULT_DECIMALS: u8 = 6;

/// Ordered resolver steps, tried strictly in sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResolverStep {
    /// Aggregator's per-token metadata endpoint
    TokenEndpoint,
    /// Aggregator's bulk token list, linear scan for the mint
    TokenList,
    /// Direct blockchain account-info query for the mint account
    AccountInfo,
}

const RESOLVER_STEPS: [ResolverStep; 3] = [
    ResolverStep::TokenEndpoint,
    ResolverStep::TokenList,
    ResolverStep::AccountInfo,
];

/// Resolves token decimals via the aggregator and the chain RPC
pub struct DecimalsResolver {
    client: Client,
    aggregator_url: String,
    rpc_url: String,
}

#[derive(Debug, Deserialize)]
struct TokenMeta {
    address: String,
    #[allow(dead_code)]
    symbol: Option<String>,
    decimals: u8,
}

impl DecimalsResolver {
    pub fn new(aggregator_url: &str, rpc_url: &str) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            aggregator_url: aggregator_url.trim_end_matches('/').to_string(),
            rpc_url: rpc_url.to_string(),
        }
    }

    /// Resolve decimals for a mint - never fails, always returns a value
    ///
    /// Each step is attempted only if the prior step errored or found no
    /// match; individual failures are logged and swallowed. If all steps
    /// fail, returns [`DEFAULT_DECIMALS`].
    pub async fn resolve(&self, mint: &str, cache: &mut RequestCache) -> u8 {
        if let Some(decimals) = cache.get_decimals(mint) {
            return decimals;
        }

        for step in RESOLVER_STEPS {
            match self.try_step(step, mint).await {
                Ok(Some(decimals)) => {
                    debug!("Resolved decimals for {} via {:?}: {}", mint, step, decimals);
                    cache.put_decimals(mint, decimals);
                    return decimals;
                }
                Ok(None) => {
                    debug!("No match for {} in {:?}", mint, step);
                }
                Err(e) => {
                    warn!("Decimals step {:?} failed for {}: {}", step, mint, e);
                }
            }
        }

        warn!(
            "All decimals sources failed for {}, defaulting to {}",
            mint, DEFAULT_DECIMALS
        );
        cache.put_decimals(mint, DEFAULT_DECIMALS);
        DEFAULT_DECIMALS
    }

    async fn try_step(&self, step: ResolverStep, mint: &str) -> anyhow::Result<Option<u8>> {
        match step {
            ResolverStep::TokenEndpoint => self.from_token_endpoint(mint).await,
            ResolverStep::TokenList => self.from_token_list(mint).await,
            ResolverStep::AccountInfo => self.from_account_info(mint).await,
        }
    }

    async fn from_token_endpoint(&self, mint: &str) -> anyhow::Result<Option<u8>> {
        let url = format!("{}/token/{}", self.aggregator_url, mint);
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!(
                "token endpoint returned {}",
                response.status()
            ));
        }

        let meta: TokenMeta = response.json().await?;
        Ok(Some(meta.decimals))
    }

    async fn from_token_list(&self, mint: &str) -> anyhow::Result<Option<u8>> {
        let url = format!("{}/tokens", self.aggregator_url);
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!("token list returned {}", response.status()));
        }

        let tokens: Vec<TokenMeta> = response.json().await?;
        Ok(tokens
            .into_iter()
            .find(|t| t.address == mint)
            .map(|t| t.decimals))
    }

    /// JSON-RPC getAccountInfo with jsonParsed encoding; decimals live at
    /// result.value.data.parsed.info.decimals for mint accounts
    async fn from_account_info(&self, mint: &str) -> anyhow::Result<Option<u8>> {
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "getAccountInfo",
            "params": [mint, { "encoding": "jsonParsed" }]
        });

        let response = self.client.post(&self.rpc_url).json(&body).send().await?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!("rpc returned {}", response.status()));
        }

        let payload: serde_json::Value = response.json().await?;
        let decimals = payload["result"]["value"]["data"]["parsed"]["info"]["decimals"].as_u64();

        match decimals {
            Some(d) if d <= u8::MAX as u64 => Ok(Some(d as u8)),
            Some(d) => Err(anyhow::anyhow!("decimals out of range: {}", d)),
            None => Ok(None),
        }
    }
}
