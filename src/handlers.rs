//! Event handlers and HTTP surface
//!
//! The handlers are the only consumers of the reconciliation and
//! orchestration components. Pipeline failures are converted into a
//! structured `{success: false}` result - they never become HTTP errors,
//! because the webhook sender only needs the per-event outcome.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

use crate::amount::to_raw_amount;
use crate::balances::{ActualBalanceProvider, VirtualBalanceProvider};
use crate::cache::RequestCache;
use crate::exit::{ExitCalculator, ExitPlan};
use crate::metadata::DecimalsResolver;
use crate::slippage::{direction_of, is_high_risk_mint, select_slippage_bps, TradeDirection};
use crate::swap::{SwapOrchestrator, SwapOutcome};
use crate::types::{
    AgentTransactionData, ExecutorError, Result, TradeEvent, TradeSignalData,
};

/// Application state shared across handlers
pub struct AppState {
    pub resolver: Arc<DecimalsResolver>,
    pub actual: Arc<ActualBalanceProvider>,
    pub virtual_balances: Arc<VirtualBalanceProvider>,
    pub exit: ExitCalculator,
    pub orchestrator: Arc<SwapOrchestrator>,
    pub wallet_pubkey: String,
}

/// Build the webhook router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/webhook", post(webhook))
        .route("/health", get(health))
        .layer(CorsLayer::new().allow_origin(Any))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health - service status
async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "wallet": state.wallet_pubkey,
    }))
}

/// POST /webhook - inbound trade event
///
/// Malformed or unknown event kinds get a 400; everything downstream of a
/// successfully parsed event is reported in the result body.
async fn webhook(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<serde_json::Value>,
) -> (StatusCode, Json<serde_json::Value>) {
    let event: TradeEvent = match serde_json::from_value(payload) {
        Ok(event) => event,
        Err(e) => {
            warn!("Rejected malformed trade event: {}", e);
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({
                    "success": false,
                    "error": format!("invalid trade event: {}", e),
                })),
            );
        }
    };

    // Correlates the pipeline's log lines for one inbound event
    let correlation_id = Uuid::new_v4();
    info!("Processing trade event {}", correlation_id);

    let result = match event {
        TradeEvent::AgentTransaction { agent_id, data } => {
            handle_agent_transaction(&state, &agent_id, data).await
        }
        TradeEvent::TradeSignal { agent_id, data } => {
            handle_trade_signal(&state, &agent_id, data).await
        }
    };

    (StatusCode::OK, Json(result))
}

/// Handle an `agentTransactions` event
///
/// A sale into the native asset is an exit: the requested amount is
/// expressed against the virtual ledger and must be reconciled before
/// anything is sold. Buys pass through with their stated amount.
pub async fn handle_agent_transaction(
    state: &AppState,
    agent_id: &str,
    data: AgentTransactionData,
) -> serde_json::Value {
    let direction = direction_of(&data.input_mint, &data.output_mint);
    let is_exit = direction == TradeDirection::SellForNative;

    info!(
        "agentTransactions {} for agent {}: {} -> {} amount {}{}",
        data.id,
        agent_id,
        data.input_mint,
        data.output_mint,
        data.amount,
        if is_exit { " (exit)" } else { "" }
    );

    let mut cache = RequestCache::new();
    let outcome = run_agent_transaction(state, agent_id, &data, is_exit, &mut cache).await;

    match outcome {
        Ok((swap, plan)) => success_result(data.id, &swap, plan.as_ref()),
        Err(e) => failure_result(data.id, &e, is_exit),
    }
}

async fn run_agent_transaction(
    state: &AppState,
    agent_id: &str,
    data: &AgentTransactionData,
    is_exit: bool,
    cache: &mut RequestCache,
) -> Result<(SwapOutcome, Option<ExitPlan>)> {
    let direction = direction_of(&data.input_mint, &data.output_mint);

    let (raw_amount, plan) = if is_exit {
        let plan = state
            .exit
            .compute_exit_plan(
                data.amount,
                &data.input_mint,
                data.input_symbol.as_deref(),
                agent_id,
                cache,
            )
            .await?;
        (plan.amount_to_sell_raw, Some(plan))
    } else {
        let decimals = state.resolver.resolve(&data.input_mint, cache).await;
        (to_raw_amount(data.amount, decimals)?, None)
    };

    let slippage_bps = select_slippage_bps(
        direction,
        is_exit,
        is_high_risk_mint(&data.input_mint),
        None,
    );

    let swap = state
        .orchestrator
        .execute_swap(&data.input_mint, &data.output_mint, raw_amount, slippage_bps)
        .await?;

    Ok((swap, plan))
}

/// Handle a `tradeSignals` event
///
/// Signal flows trade the stated wallet amount directly - no virtual
/// ledger reconciliation - and honor the event's slippage hint.
pub async fn handle_trade_signal(
    state: &AppState,
    agent_id: &str,
    data: TradeSignalData,
) -> serde_json::Value {
    info!(
        "tradeSignals {} for agent {}: {} -> {} amount {}",
        data.id, agent_id, data.input_mint, data.output_mint, data.trade_amount
    );

    let mut cache = RequestCache::new();
    let outcome = run_trade_signal(state, &data, &mut cache).await;

    match outcome {
        Ok(swap) => success_result(data.id, &swap, None),
        Err(e) => failure_result(data.id, &e, false),
    }
}

async fn run_trade_signal(
    state: &AppState,
    data: &TradeSignalData,
    cache: &mut RequestCache,
) -> Result<SwapOutcome> {
    let direction = direction_of(&data.input_mint, &data.output_mint);
    let decimals = state.resolver.resolve(&data.input_mint, cache).await;
    let raw_amount = to_raw_amount(data.trade_amount, decimals)?;

    let slippage_bps = select_slippage_bps(
        direction,
        false,
        is_high_risk_mint(&data.input_mint),
        data.slippage,
    );

    state
        .orchestrator
        .execute_swap(&data.input_mint, &data.output_mint, raw_amount, slippage_bps)
        .await
}

fn success_result(id: u64, swap: &SwapOutcome, plan: Option<&ExitPlan>) -> serde_json::Value {
    let mut result = serde_json::json!({
        "success": true,
        "id": id,
        "timestamp": chrono::Utc::now(),
        "requestId": swap.request_id,
        "executionStatus": swap.status.as_str(),
        "signature": swap.signature,
        "inAmount": swap.in_amount_raw,
        "outAmount": swap.out_amount_raw,
        "slippageBps": swap.slippage_bps,
        "priceImpactPct": swap.price_impact_pct,
    });

    if let Some(plan) = plan {
        result["exitStrategyInfo"] = serde_json::json!({
            "strategy": plan.strategy.as_str(),
            "percentageToSell": plan.percentage_to_sell,
            "amountToSellUi": plan.amount_to_sell_ui,
            "virtualBalance": plan.virtual_balance,
            "actualBalance": plan.actual_balance,
            "requestedAmount": plan.requested_amount,
            "fallbackMode": plan.fallback_mode,
            "willSellAll": plan.will_sell_all,
        });
    }

    result
}

fn failure_result(id: u64, error: &ExecutorError, is_exit: bool) -> serde_json::Value {
    warn!("Event {} failed: {}", id, error);

    let mut result = serde_json::json!({
        "success": false,
        "id": id,
        "timestamp": chrono::Utc::now(),
        "error": error.to_string(),
    });

    if is_exit {
        result["isExit"] = serde_json::Value::Bool(true);
    }

    result
}
