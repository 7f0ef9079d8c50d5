//! Exit strategy calculator
//!
//! The reconciliation engine. An exit request arrives denominated against
//! the agent platform's virtual ledger, which can drift from the wallet's
//! real holdings. This module decides, deterministically, how much of the
//! actual position to liquidate - and never authorizes selling more than
//! the wallet holds.

use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::amount::to_raw_amount;
use crate::balances::{lookup_virtual_balance, ActualBalanceProvider, VirtualBalanceProvider};
use crate::cache::RequestCache;
use crate::metadata::DecimalsResolver;
use crate::types::{ActualBalanceEntry, ExecutorError, Result};

/// Threshold above which a partial exit is treated as selling everything,
/// tolerating dust and fee residue on near-total exits
const SELL_ALL_THRESHOLD: &str = "0.99";

/// Which reconciliation branch produced the plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitStrategy {
    /// Virtual ledger unreachable and actual <= requested: sell everything
    FallbackExitAll,
    /// Virtual ledger unreachable, actual > requested: sell the requested amount
    FallbackExitWebhook,
    /// Agent believes the position is closed: liquidate any residual
    FullExitZeroVirtual,
    /// Requested >= virtual balance: the agent intends a full close
    FullExitComplete,
    /// Proportional exit mapped onto the real position
    PartialExit,
}

impl ExitStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitStrategy::FallbackExitAll => "FALLBACK_EXIT_ALL",
            ExitStrategy::FallbackExitWebhook => "FALLBACK_EXIT_WEBHOOK",
            ExitStrategy::FullExitZeroVirtual => "FULL_EXIT_ZERO_VIRTUAL",
            ExitStrategy::FullExitComplete => "FULL_EXIT_COMPLETE",
            ExitStrategy::PartialExit => "PARTIAL_EXIT",
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(
            self,
            ExitStrategy::FallbackExitAll | ExitStrategy::FallbackExitWebhook
        )
    }
}

/// Computed exit plan
///
/// Invariant: `amount_to_sell_ui <= actual_balance` in every branch.
#[derive(Debug, Clone, Serialize)]
pub struct ExitPlan {
    pub strategy: ExitStrategy,
    pub percentage_to_sell: Decimal,
    pub amount_to_sell_ui: Decimal,
    pub amount_to_sell_raw: u64,
    pub virtual_balance: Decimal,
    pub actual_balance: Decimal,
    pub requested_amount: Decimal,
    pub fallback_mode: bool,
    pub will_sell_all: bool,
    pub decimals: u8,
}

/// Computes exit plans from live balance reads
pub struct ExitCalculator {
    actual: Arc<ActualBalanceProvider>,
    virtual_balances: Arc<VirtualBalanceProvider>,
    resolver: Arc<DecimalsResolver>,
}

impl ExitCalculator {
    pub fn new(
        actual: Arc<ActualBalanceProvider>,
        virtual_balances: Arc<VirtualBalanceProvider>,
        resolver: Arc<DecimalsResolver>,
    ) -> Self {
        Self {
            actual,
            virtual_balances,
            resolver,
        }
    }

    /// Compute how much of the actual position to sell for an exit request
    ///
    /// The virtual and actual balance reads are independent and issued
    /// concurrently. A failed virtual read degrades the strategy to
    /// fallback mode; it never aborts the request.
    pub async fn compute_exit_plan(
        &self,
        requested_amount: Decimal,
        mint: &str,
        symbol: Option<&str>,
        agent_id: &str,
        cache: &mut RequestCache,
    ) -> Result<ExitPlan> {
        let (virtual_result, actual_result) = tokio::join!(
            self.virtual_balances.get_virtual_balances(agent_id),
            self.actual.get_actual_balance(mint, &self.resolver, cache),
        );

        let actual = actual_result?;
        if !actual.found || actual.raw_units == 0 {
            return Err(ExecutorError::NoBalance {
                mint: mint.to_string(),
            });
        }

        let virtual_balance = match &virtual_result {
            Ok(entries) => Some(lookup_virtual_balance(entries, mint, symbol)),
            Err(e) => {
                warn!(
                    "Virtual balance unavailable for agent {}, entering fallback mode: {}",
                    agent_id, e
                );
                None
            }
        };

        let plan = plan_from_balances(requested_amount, virtual_balance, &actual)?;

        info!(
            "Exit plan for {}: {} | sell {} of {} ({}%){}",
            mint,
            plan.strategy.as_str(),
            plan.amount_to_sell_ui,
            plan.actual_balance,
            plan.percentage_to_sell * Decimal::from(100),
            if plan.fallback_mode { " [fallback]" } else { "" }
        );

        Ok(plan)
    }
}

/// Pure reconciliation branch logic
///
/// `virtual_balance` is `None` when the virtual-ledger read failed
/// (fallback mode), `Some(0)` when it succeeded but the agent holds no
/// virtual position - the two are deliberately distinct branches.
pub fn plan_from_balances(
    requested_amount: Decimal,
    virtual_balance: Option<Decimal>,
    actual: &ActualBalanceEntry,
) -> Result<ExitPlan> {
    let actual_balance = actual.ui_amount;
    if actual_balance <= Decimal::ZERO {
        return Err(ExecutorError::NoBalance {
            mint: actual.mint.clone(),
        });
    }

    let (strategy, percentage_to_sell, amount_to_sell_ui) = match virtual_balance {
        // Fallback mode: virtual ledger unreachable, compare against actual directly
        None => {
            if actual_balance <= requested_amount {
                (ExitStrategy::FallbackExitAll, Decimal::ONE, actual_balance)
            } else {
                (
                    ExitStrategy::FallbackExitWebhook,
                    requested_amount / actual_balance,
                    requested_amount,
                )
            }
        }
        // Agent believes the position is already closed; liquidate residue
        Some(virt) if virt.is_zero() => (
            ExitStrategy::FullExitZeroVirtual,
            Decimal::ONE,
            actual_balance,
        ),
        // Full close intended
        Some(virt) if requested_amount >= virt => {
            (ExitStrategy::FullExitComplete, Decimal::ONE, actual_balance)
        }
        // Proportional intent mapped onto the real position
        Some(virt) => {
            let pct = requested_amount / virt;
            (ExitStrategy::PartialExit, pct, actual_balance * pct)
        }
    };

    // Oversell guard: the plan must never exceed the wallet's holdings
    let amount_to_sell_ui = amount_to_sell_ui.min(actual_balance);

    let amount_to_sell_raw = to_raw_amount(amount_to_sell_ui, actual.decimals)
        .map_err(|e| ExecutorError::Calculation(e.to_string()))?;

    let will_sell_all =
        percentage_to_sell >= Decimal::from_str_exact(SELL_ALL_THRESHOLD).unwrap_or(Decimal::ONE);

    Ok(ExitPlan {
        strategy,
        percentage_to_sell,
        amount_to_sell_ui,
        amount_to_sell_raw,
        virtual_balance: virtual_balance.unwrap_or(Decimal::ZERO),
        actual_balance,
        requested_amount,
        fallback_mode: virtual_balance.is_none(),
        will_sell_all,
        decimals: actual.decimals,
    })
}
