//! Process configuration
//!
//! All environment access happens here, once, at startup. Components
//! receive what they need through their constructors; nothing reads the
//! environment at call sites.

/// Immutable configuration loaded from environment
#[derive(Debug, Clone)]
pub struct Config {
    /// Swap aggregator base URL (order/execute/holdings/token endpoints)
    pub aggregator_url: String,
    /// Agent platform base URL (virtual wallet balances)
    pub agent_platform_url: String,
    /// Blockchain RPC endpoint (account-info decimals fallback)
    pub rpc_url: String,
    /// Base58-encoded 64-byte wallet secret key
    pub wallet_secret: String,
    /// Webhook listen port
    pub port: u16,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let wallet_secret = std::env::var("WALLET_SECRET")
            .map_err(|_| anyhow::anyhow!("WALLET_SECRET environment variable required"))?;

        let aggregator_url = std::env::var("AGGREGATOR_URL")
            .unwrap_or_else(|_| "https://lite-api.jup.ag/ultra/v1".to_string());

        let agent_platform_url = std::env::var("AGENT_PLATFORM_URL")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        let rpc_url = std::env::var("SOLANA_RPC_URL")
            .unwrap_or_else(|_| "https://api.mainnet-beta.solana.com".to_string());

        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        Ok(Self {
            aggregator_url,
            agent_platform_url,
            rpc_url,
            wallet_secret,
            port,
        })
    }
}
