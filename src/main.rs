//! Swap Executor - webhook-driven trade execution service
//!
//! 1. Receives trade-intent events from the agent platform webhook
//! 2. Reconciles virtual-ledger exit amounts against real wallet holdings
//! 3. Orders, signs and executes swaps through the aggregator

use std::sync::Arc;
use tracing::{info, Level};

use swap_executor::{
    ActualBalanceProvider, AppState, Config, DecimalsResolver, ExitCalculator, SwapOrchestrator,
    VirtualBalanceProvider, Wallet,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    info!("Starting Swap Executor...");

    let config = Config::from_env()?;

    // Key material is loaded once and held immutable for the process lifetime
    let wallet = Arc::new(Wallet::from_base58(&config.wallet_secret)?);
    let wallet_pubkey = wallet.pubkey();
    info!("✓ Wallet loaded: {}", wallet_pubkey);

    let resolver = Arc::new(DecimalsResolver::new(
        &config.aggregator_url,
        &config.rpc_url,
    ));
    let actual = Arc::new(ActualBalanceProvider::new(
        &config.aggregator_url,
        &wallet_pubkey,
    ));
    let virtual_balances = Arc::new(VirtualBalanceProvider::new(&config.agent_platform_url));
    let orchestrator = Arc::new(SwapOrchestrator::new(&config.aggregator_url, wallet));
    let exit = ExitCalculator::new(
        Arc::clone(&actual),
        Arc::clone(&virtual_balances),
        Arc::clone(&resolver),
    );
    info!("✓ Pipeline components initialized");

    let state = Arc::new(AppState {
        resolver,
        actual,
        virtual_balances,
        exit,
        orchestrator,
        wallet_pubkey,
    });

    let app = swap_executor::handlers::router(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    info!("🚀 Swap Executor listening on port {}", config.port);

    axum::serve(listener, app).await?;

    Ok(())
}
