//! Swap order orchestrator
//!
//! Requests an executable order from the aggregator, signs it, submits it
//! for execution, and assembles the result. No step retries: a failure at
//! order, signing, or execution terminates the flow and becomes the
//! event's final outcome.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::types::{ExecutionStatus, ExecutorError, Result};
use crate::wallet::Wallet;

/// Aggregator order response: unsigned transaction plus pricing
#[derive(Debug, Deserialize)]
pub struct OrderResponse {
    /// Unsigned transaction blob; absent when no route exists
    pub transaction: Option<String>,
    #[serde(rename = "requestId")]
    pub request_id: String,
    #[serde(rename = "inAmount")]
    pub in_amount: String,
    #[serde(rename = "outAmount")]
    pub out_amount: String,
    #[serde(rename = "slippageBps")]
    pub slippage_bps: Option<u16>,
    #[serde(rename = "priceImpactPct", default)]
    pub price_impact_pct: Option<f64>,
}

#[derive(Debug, Serialize)]
struct ExecuteRequest {
    #[serde(rename = "signedTransaction")]
    signed_transaction: String,
    #[serde(rename = "requestId")]
    request_id: String,
}

#[derive(Debug, Deserialize)]
struct ExecuteResponse {
    status: String,
    signature: Option<String>,
}

/// Assembled outcome of an order-sign-execute sequence
#[derive(Debug, Clone)]
pub struct SwapOutcome {
    pub request_id: String,
    pub status: ExecutionStatus,
    pub signature: Option<String>,
    pub in_amount_raw: u64,
    pub out_amount_raw: u64,
    pub slippage_bps: u16,
    pub price_impact_pct: Option<f64>,
}

/// Drives the order -> sign -> execute sequence against the aggregator
pub struct SwapOrchestrator {
    client: Client,
    aggregator_url: String,
    wallet: Arc<Wallet>,
}

impl SwapOrchestrator {
    pub fn new(aggregator_url: &str, wallet: Arc<Wallet>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            aggregator_url: aggregator_url.trim_end_matches('/').to_string(),
            wallet,
        }
    }

    /// Execute a swap end to end
    ///
    /// An order without a transaction payload means no viable route exists
    /// (`NoRoute`, terminal for this request, signing never attempted).
    /// The execution endpoint's `status` and `signature` are propagated
    /// verbatim, keyed by the order's `requestId`.
    pub async fn execute_swap(
        &self,
        input_mint: &str,
        output_mint: &str,
        raw_amount: u64,
        slippage_bps: u16,
    ) -> Result<SwapOutcome> {
        let order = self
            .fetch_order(input_mint, output_mint, raw_amount, slippage_bps)
            .await?;

        let unsigned = order.transaction.as_deref().ok_or_else(|| {
            ExecutorError::NoRoute(format!("{} -> {}", input_mint, output_mint))
        })?;

        let signed = self.wallet.sign_transaction_blob(unsigned)?;

        debug!(
            "Submitting signed transaction for request {}",
            order.request_id
        );
        let execution = self.submit_execution(&signed, &order.request_id).await?;

        let status = if execution.status.eq_ignore_ascii_case("success") {
            ExecutionStatus::Success
        } else {
            ExecutionStatus::Failed
        };

        info!(
            "Swap {} -> {} executed: {} | signature: {:?}",
            input_mint,
            output_mint,
            status.as_str(),
            execution.signature
        );

        let in_amount_raw = order.in_amount.parse().unwrap_or_else(|_| {
            warn!(
                "Malformed inAmount {:?} in order {}, reporting requested amount",
                order.in_amount, order.request_id
            );
            raw_amount
        });
        let out_amount_raw = order.out_amount.parse().unwrap_or_else(|_| {
            warn!(
                "Malformed outAmount {:?} in order {}",
                order.out_amount, order.request_id
            );
            0
        });

        Ok(SwapOutcome {
            request_id: order.request_id,
            status,
            signature: execution.signature,
            in_amount_raw,
            out_amount_raw,
            slippage_bps: order.slippage_bps.unwrap_or(slippage_bps),
            price_impact_pct: order.price_impact_pct,
        })
    }

    async fn fetch_order(
        &self,
        input_mint: &str,
        output_mint: &str,
        raw_amount: u64,
        slippage_bps: u16,
    ) -> Result<OrderResponse> {
        let url = format!("{}/order", self.aggregator_url);
        let amount = raw_amount.to_string();
        let taker = self.wallet.pubkey();
        let bps = slippage_bps.to_string();

        let response = self
            .client
            .get(&url)
            .query(&[
                ("inputMint", input_mint),
                ("outputMint", output_mint),
                ("amount", amount.as_str()),
                ("taker", taker.as_str()),
                ("slippageBps", bps.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ExecutorError::Transport(format!(
                "order request failed: {} - {}",
                status, text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| ExecutorError::Transport(format!("order parse failed: {}", e)))
    }

    async fn submit_execution(
        &self,
        signed_transaction: &str,
        request_id: &str,
    ) -> Result<ExecuteResponse> {
        let url = format!("{}/execute", self.aggregator_url);
        let body = ExecuteRequest {
            signed_transaction: signed_transaction.to_string(),
            request_id: request_id.to_string(),
        };

        let response = self.client.post(&url).json(&body).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ExecutorError::Transport(format!(
                "execute request failed: {} - {}",
                status, text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| ExecutorError::Transport(format!("execute parse failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NATIVE_MINT;
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
    use solana_sdk::{
        message::Message,
        signature::{Keypair, Signer},
        system_instruction,
        transaction::Transaction,
    };
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const MINT: &str = "DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263";

    fn wallet_and_blob() -> (Arc<Wallet>, String) {
        let keypair = Keypair::new();
        let payer = keypair.pubkey();
        let ix = system_instruction::transfer(&payer, &payer, 1);
        let tx = Transaction::new_unsigned(Message::new(&[ix], Some(&payer)));
        let blob = BASE64.encode(bincode::serialize(&tx).unwrap());

        let secret = bs58::encode(keypair.to_bytes()).into_string();
        (Arc::new(Wallet::from_base58(&secret).unwrap()), blob)
    }

    #[tokio::test]
    async fn test_no_transaction_payload_is_no_route_and_skips_execute() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/order"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "transaction": null,
                "requestId": "req-1",
                "inAmount": "1000000",
                "outAmount": "0"
            })))
            .mount(&server)
            .await;
        // Execute must never be called when there is no route
        Mock::given(method("POST"))
            .and(path("/execute"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let (wallet, _) = wallet_and_blob();
        let orchestrator = SwapOrchestrator::new(&server.uri(), wallet);

        let err = orchestrator
            .execute_swap(MINT, NATIVE_MINT, 1_000_000, 800)
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutorError::NoRoute(_)));
    }

    #[tokio::test]
    async fn test_order_sign_execute_happy_path() {
        let server = MockServer::start().await;
        let (wallet, blob) = wallet_and_blob();

        Mock::given(method("GET"))
            .and(path("/order"))
            .and(query_param("inputMint", MINT))
            .and(query_param("outputMint", NATIVE_MINT))
            .and(query_param("amount", "1000000"))
            .and(query_param("slippageBps", "800"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "transaction": blob,
                "requestId": "req-42",
                "inAmount": "1000000",
                "outAmount": "987654",
                "slippageBps": 800,
                "priceImpactPct": 0.12
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/execute"))
            .and(body_partial_json(serde_json::json!({ "requestId": "req-42" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "Success",
                "signature": "5sig"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let orchestrator = SwapOrchestrator::new(&server.uri(), wallet);
        let outcome = orchestrator
            .execute_swap(MINT, NATIVE_MINT, 1_000_000, 800)
            .await
            .unwrap();

        assert_eq!(outcome.status, ExecutionStatus::Success);
        assert_eq!(outcome.signature.as_deref(), Some("5sig"));
        assert_eq!(outcome.request_id, "req-42");
        assert_eq!(outcome.out_amount_raw, 987_654);
    }

    #[tokio::test]
    async fn test_malformed_amounts_fall_back_without_failing_swap() {
        let server = MockServer::start().await;
        let (wallet, blob) = wallet_and_blob();

        Mock::given(method("GET"))
            .and(path("/order"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "transaction": blob,
                "requestId": "req-77",
                "inAmount": "not-a-number",
                "outAmount": ""
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/execute"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "Success",
                "signature": "6sig"
            })))
            .mount(&server)
            .await;

        let orchestrator = SwapOrchestrator::new(&server.uri(), wallet);
        let outcome = orchestrator
            .execute_swap(MINT, NATIVE_MINT, 1_000_000, 800)
            .await
            .unwrap();

        // Unparseable pricing fields degrade to the requested amount / zero
        assert_eq!(outcome.status, ExecutionStatus::Success);
        assert_eq!(outcome.in_amount_raw, 1_000_000);
        assert_eq!(outcome.out_amount_raw, 0);
    }

    #[tokio::test]
    async fn test_failed_execution_propagated_verbatim() {
        let server = MockServer::start().await;
        let (wallet, blob) = wallet_and_blob();

        Mock::given(method("GET"))
            .and(path("/order"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "transaction": blob,
                "requestId": "req-9",
                "inAmount": "1000000",
                "outAmount": "5"
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/execute"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "Failed",
                "signature": null
            })))
            .mount(&server)
            .await;

        let orchestrator = SwapOrchestrator::new(&server.uri(), wallet);
        let outcome = orchestrator
            .execute_swap(MINT, NATIVE_MINT, 1_000_000, 500)
            .await
            .unwrap();

        assert_eq!(outcome.status, ExecutionStatus::Failed);
        assert!(outcome.signature.is_none());
    }
}
