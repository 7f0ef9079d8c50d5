//! Balance providers
//!
//! Two independent reads of the same capability: the aggregator's view of
//! the wallet's real on-chain holdings, and the agent platform's believed
//! (virtual) holdings. The virtual provider's failure is a first-class
//! outcome - its absence is what triggers fallback mode in the exit
//! calculator.

use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::amount::from_raw_amount;
use crate::cache::RequestCache;
use crate::metadata::DecimalsResolver;
use crate::types::{ActualBalanceEntry, ExecutorError, Result, VirtualBalanceEntry};

/// One entry of the aggregator's holdings-by-address response
#[derive(Debug, Clone, Deserialize)]
pub struct HoldingEntry {
    pub mint: String,
    pub symbol: Option<String>,
    /// Raw units as a decimal string
    pub amount: String,
}

#[derive(Debug, Deserialize)]
struct HoldingsResponse {
    holdings: Vec<HoldingEntry>,
}

/// Queries the wallet's real on-chain holdings via the aggregator
pub struct ActualBalanceProvider {
    client: Client,
    aggregator_url: String,
    wallet_address: String,
}

impl ActualBalanceProvider {
    pub fn new(aggregator_url: &str, wallet_address: &str) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            aggregator_url: aggregator_url.trim_end_matches('/').to_string(),
            wallet_address: wallet_address.to_string(),
        }
    }

    /// Get the wallet's actual balance for a mint
    ///
    /// Fetches the full holdings list (once per request, memoized in the
    /// cache) and linear-scans for the mint. Not holding the token yields
    /// `found = false` with zero units - not an error. Decimals are always
    /// resolved through the metadata resolver, never defaulted here.
    pub async fn get_actual_balance(
        &self,
        mint: &str,
        resolver: &DecimalsResolver,
        cache: &mut RequestCache,
    ) -> Result<ActualBalanceEntry> {
        if cache.holdings().is_none() {
            let holdings = self.fetch_holdings().await?;
            cache.put_holdings(holdings);
        }

        let entry = cache
            .holdings()
            .and_then(|list| list.iter().find(|h| h.mint == mint))
            .cloned();

        let decimals = resolver.resolve(mint, cache).await;

        match entry {
            Some(holding) => {
                let raw_units = holding.amount.parse::<u64>().map_err(|e| {
                    ExecutorError::Transport(format!(
                        "malformed holdings amount {:?}: {}",
                        holding.amount, e
                    ))
                })?;

                debug!(
                    "Actual balance for {}: {} raw ({} decimals)",
                    mint, raw_units, decimals
                );

                Ok(ActualBalanceEntry {
                    mint: mint.to_string(),
                    symbol: holding.symbol,
                    raw_units,
                    decimals,
                    ui_amount: from_raw_amount(raw_units, decimals)?,
                    found: raw_units > 0,
                })
            }
            None => {
                debug!("Wallet holds none of {}", mint);
                Ok(ActualBalanceEntry {
                    mint: mint.to_string(),
                    symbol: None,
                    raw_units: 0,
                    decimals,
                    ui_amount: Decimal::ZERO,
                    found: false,
                })
            }
        }
    }

    async fn fetch_holdings(&self) -> Result<Vec<HoldingEntry>> {
        let url = format!("{}/holdings/{}", self.aggregator_url, self.wallet_address);
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(ExecutorError::Transport(format!(
                "holdings fetch failed: {}",
                response.status()
            )));
        }

        let payload: HoldingsResponse = response
            .json()
            .await
            .map_err(|e| ExecutorError::Transport(format!("holdings parse failed: {}", e)))?;

        debug!("Fetched {} holdings for wallet", payload.holdings.len());
        Ok(payload.holdings)
    }
}

#[derive(Debug, Deserialize)]
struct VirtualBalancesResponse {
    balances: Vec<VirtualBalanceEntry>,
}

/// Queries the agent platform's believed holdings for an agent
pub struct VirtualBalanceProvider {
    client: Client,
    agent_platform_url: String,
}

impl VirtualBalanceProvider {
    pub fn new(agent_platform_url: &str) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            agent_platform_url: agent_platform_url.trim_end_matches('/').to_string(),
        }
    }

    /// Fetch the agent's virtual balances
    ///
    /// Any non-success response or transport failure surfaces as
    /// `ExternalService` - never swallowed, because the exit calculator
    /// branches on exactly this outcome.
    pub async fn get_virtual_balances(&self, agent_id: &str) -> Result<Vec<VirtualBalanceEntry>> {
        let url = format!(
            "{}/agents/{}/wallet/balances",
            self.agent_platform_url, agent_id
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ExecutorError::ExternalService(format!("agent platform: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            warn!("Virtual balance fetch failed: {} - {}", status, text);
            return Err(ExecutorError::ExternalService(format!(
                "agent platform returned {}",
                status
            )));
        }

        let payload: VirtualBalancesResponse = response
            .json()
            .await
            .map_err(|e| ExecutorError::ExternalService(format!("balance parse failed: {}", e)))?;

        Ok(payload.balances)
    }
}

/// Look up a virtual balance by mint, falling back to a case-insensitive
/// symbol match. Absence of a match is balance zero, distinct from the
/// provider itself failing.
pub fn lookup_virtual_balance(
    entries: &[VirtualBalanceEntry],
    mint: &str,
    symbol: Option<&str>,
) -> Decimal {
    if let Some(entry) = entries.iter().find(|e| e.token_mint == mint) {
        return entry.balance;
    }

    if let Some(symbol) = symbol {
        if let Some(entry) = entries
            .iter()
            .find(|e| e.symbol.eq_ignore_ascii_case(symbol))
        {
            return entry.balance;
        }
    }

    Decimal::ZERO
}
