//! Core domain types and error taxonomy

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Wrapped SOL mint - the chain's native asset identifier
pub const NATIVE_MINT: &str = "So11111111111111111111111111111111111111112";

/// A token amount with its resolved decimal precision
///
/// Invariant: `ui_amount == raw_units / 10^decimals`. Decimals must be
/// resolved through the metadata resolver before any conversion; a stale
/// default silently corrupts `raw_units`.
#[derive(Debug, Clone, Serialize)]
pub struct TokenAmount {
    pub mint: String,
    pub raw_units: u64,
    pub decimals: u8,
    pub ui_amount: Decimal,
}

impl TokenAmount {
    pub fn from_raw(mint: &str, raw_units: u64, decimals: u8) -> Result<Self> {
        Ok(Self {
            mint: mint.to_string(),
            raw_units,
            decimals,
            ui_amount: crate::amount::from_raw_amount(raw_units, decimals)?,
        })
    }
}

/// Wallet's true on-chain holding for one mint, as reported by the aggregator
///
/// `found = false` means the wallet holds zero of the token. That is a
/// normal outcome, not an error.
#[derive(Debug, Clone, Serialize)]
pub struct ActualBalanceEntry {
    pub mint: String,
    pub symbol: Option<String>,
    pub raw_units: u64,
    pub decimals: u8,
    pub ui_amount: Decimal,
    pub found: bool,
}

/// Agent platform's believed holding - may be stale relative to the chain
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VirtualBalanceEntry {
    #[serde(rename = "tokenMint")]
    pub token_mint: String,
    pub symbol: String,
    pub balance: Decimal,
    #[serde(rename = "valueUsd")]
    pub value_usd: Decimal,
}

/// Final status of an executed swap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Success,
    Failed,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Success => "success",
            ExecutionStatus::Failed => "failed",
        }
    }
}

/// Inbound trade event from the agent platform webhook
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event")]
pub enum TradeEvent {
    #[serde(rename = "agentTransactions")]
    AgentTransaction {
        #[serde(rename = "agentId")]
        agent_id: String,
        data: AgentTransactionData,
    },
    #[serde(rename = "tradeSignals")]
    TradeSignal {
        #[serde(rename = "agentId")]
        agent_id: String,
        data: TradeSignalData,
    },
}

/// Payload of an `agentTransactions` event
#[derive(Debug, Clone, Deserialize)]
pub struct AgentTransactionData {
    pub id: u64,
    #[serde(rename = "inputMint")]
    pub input_mint: String,
    #[serde(rename = "outputMint")]
    pub output_mint: String,
    #[serde(rename = "inputSymbol")]
    pub input_symbol: Option<String>,
    /// Amount expressed in virtual-ledger UI terms
    pub amount: Decimal,
}

/// Payload of a `tradeSignals` event
#[derive(Debug, Clone, Deserialize)]
pub struct TradeSignalData {
    pub id: u64,
    #[serde(rename = "inputMint")]
    pub input_mint: String,
    #[serde(rename = "outputMint")]
    pub output_mint: String,
    #[serde(rename = "inputSymbol")]
    pub input_symbol: Option<String>,
    #[serde(rename = "trade_amount")]
    pub trade_amount: Decimal,
    /// Optional slippage hint in percent (e.g. 0.5 for 50 bps)
    pub slippage: Option<Decimal>,
}

/// Error taxonomy for the execution pipeline
///
/// Only the metadata resolver recovers locally (degrading to a default);
/// every other component propagates to the event handler, which converts
/// the error into a structured `{success: false}` result.
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("external service error: {0}")]
    ExternalService(String),

    #[error("no swap route available: {0}")]
    NoRoute(String),

    #[error("no balance to sell for mint {mint}")]
    NoBalance { mint: String },

    #[error("exit calculation failed: {0}")]
    Calculation(String),

    #[error("transaction signing failed: {0}")]
    Signing(String),
}

impl From<reqwest::Error> for ExecutorError {
    fn from(err: reqwest::Error) -> Self {
        ExecutorError::Transport(err.to_string())
    }
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, ExecutorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trade_event_parses_agent_transaction() {
        let raw = serde_json::json!({
            "event": "agentTransactions",
            "agentId": "agent-7",
            "data": {
                "id": 42,
                "inputMint": "DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263",
                "outputMint": NATIVE_MINT,
                "inputSymbol": "BONK",
                "amount": "1500.5"
            }
        });

        let event: TradeEvent = serde_json::from_value(raw).unwrap();
        match event {
            TradeEvent::AgentTransaction { agent_id, data } => {
                assert_eq!(agent_id, "agent-7");
                assert_eq!(data.id, 42);
                assert_eq!(data.output_mint, NATIVE_MINT);
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn test_trade_event_parses_trade_signal() {
        let raw = serde_json::json!({
            "event": "tradeSignals",
            "agentId": "agent-7",
            "data": {
                "id": 9,
                "inputMint": NATIVE_MINT,
                "outputMint": "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v",
                "trade_amount": "0.25",
                "slippage": "0.5"
            }
        });

        let event: TradeEvent = serde_json::from_value(raw).unwrap();
        match event {
            TradeEvent::TradeSignal { data, .. } => {
                assert_eq!(data.trade_amount, Decimal::new(25, 2));
                assert!(data.slippage.is_some());
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn test_unknown_event_kind_rejected() {
        let raw = serde_json::json!({
            "event": "somethingElse",
            "agentId": "agent-7",
            "data": {}
        });
        assert!(serde_json::from_value::<TradeEvent>(raw).is_err());
    }

    #[test]
    fn test_token_amount_invariant() {
        let amt = TokenAmount::from_raw("mint", 1_500_000, 6).unwrap();
        assert_eq!(amt.ui_amount, Decimal::new(15, 1));
    }
}
