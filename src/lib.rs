//! Swap Executor Library
//!
//! Trade execution and balance-reconciliation pipeline: converts
//! trade-intent events from an agent platform into signed, executed token
//! swaps via a swap-aggregation API.

pub mod amount;
pub mod balances;
pub mod cache;
pub mod config;
pub mod exit;
pub mod handlers;
pub mod metadata;
pub mod slippage;
pub mod swap;
pub mod types;
pub mod wallet;

// Re-export main types for convenience
pub use balances::{ActualBalanceProvider, VirtualBalanceProvider};
pub use cache::RequestCache;
pub use config::Config;
pub use exit::{ExitCalculator, ExitPlan, ExitStrategy};
pub use handlers::AppState;
pub use metadata::DecimalsResolver;
pub use slippage::{direction_of, select_slippage_bps, TradeDirection};
pub use swap::{SwapOrchestrator, SwapOutcome};
pub use types::{
    ActualBalanceEntry, ExecutionStatus, ExecutorError, TokenAmount, TradeEvent,
    VirtualBalanceEntry, NATIVE_MINT,
};
pub use wallet::Wallet;
