//! Slippage policy
//!
//! Pure mapping from transaction direction and token heuristics to a
//! slippage tolerance. Exits deliberately tolerate more slippage than
//! entries: a stuck position is judged worse than a costly exit.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::types::NATIVE_MINT;

/// Selling a heuristically high-risk token for SOL
const HIGH_RISK_SELL_BPS: u16 = 1000;
/// Exit transaction (position close into SOL)
const EXIT_SELL_BPS: u16 = 800;
/// Plain sale into SOL
const PLAIN_SELL_BPS: u16 = 500;
/// Buying with SOL, no explicit hint
const BUY_DEFAULT_BPS: u16 = 300;
/// Entry trade-signal flow, no explicit hint
const ENTRY_DEFAULT_BPS: u16 = 100;

const MAX_BPS: u16 = 10_000;

/// Swap direction relative to the chain's native asset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeDirection {
    /// Output is the native asset - interpreted as closing a position
    SellForNative,
    /// Input is the native asset - opening a position
    BuyWithNative,
    /// Neither side is the native asset
    TokenToToken,
}

pub fn direction_of(input_mint: &str, output_mint: &str) -> TradeDirection {
    if output_mint == NATIVE_MINT {
        TradeDirection::SellForNative
    } else if input_mint == NATIVE_MINT {
        TradeDirection::BuyWithNative
    } else {
        TradeDirection::TokenToToken
    }
}

/// Heuristic risk class: pump.fun-minted tokens carry the `pump` mint
/// suffix and see the most volatile exits
pub fn is_high_risk_mint(mint: &str) -> bool {
    mint.ends_with("pump")
}

/// Select slippage tolerance in basis points
///
/// `explicit_hint` is an upstream slippage hint in percent (0.5 => 50 bps),
/// honored only on buy/entry flows.
pub fn select_slippage_bps(
    direction: TradeDirection,
    is_exit: bool,
    high_risk: bool,
    explicit_hint: Option<Decimal>,
) -> u16 {
    match direction {
        TradeDirection::SellForNative => {
            if high_risk {
                HIGH_RISK_SELL_BPS
            } else if is_exit {
                EXIT_SELL_BPS
            } else {
                PLAIN_SELL_BPS
            }
        }
        TradeDirection::BuyWithNative => hint_to_bps(explicit_hint).unwrap_or(BUY_DEFAULT_BPS),
        TradeDirection::TokenToToken => hint_to_bps(explicit_hint).unwrap_or(ENTRY_DEFAULT_BPS),
    }
}

fn hint_to_bps(hint: Option<Decimal>) -> Option<u16> {
    let pct = hint?;
    if pct <= Decimal::ZERO {
        return None;
    }
    // Clamp before narrowing: a hint past u16::MAX bps must still land
    // on the ceiling, not drop back to the direction default
    let bps = (pct * Decimal::from(100))
        .trunc()
        .min(Decimal::from(MAX_BPS));
    bps.to_u16()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PUMP_MINT: &str = "EKpQGSJtjMFqKZ9KQbSqL2zPQCpA5xZKN2CjeJRdQpump";
    const TOKEN_MINT: &str = "DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263";

    #[test]
    fn test_direction_detection() {
        assert_eq!(
            direction_of(TOKEN_MINT, NATIVE_MINT),
            TradeDirection::SellForNative
        );
        assert_eq!(
            direction_of(NATIVE_MINT, TOKEN_MINT),
            TradeDirection::BuyWithNative
        );
        assert_eq!(
            direction_of(TOKEN_MINT, PUMP_MINT),
            TradeDirection::TokenToToken
        );
    }

    #[test]
    fn test_sell_precedence_high_risk_over_exit() {
        assert_eq!(
            select_slippage_bps(TradeDirection::SellForNative, true, true, None),
            1000
        );
        assert_eq!(
            select_slippage_bps(TradeDirection::SellForNative, true, false, None),
            800
        );
        assert_eq!(
            select_slippage_bps(TradeDirection::SellForNative, false, false, None),
            500
        );
    }

    #[test]
    fn test_buy_uses_hint_or_default() {
        let half_pct = Decimal::from_str_exact("0.5").unwrap();
        assert_eq!(
            select_slippage_bps(TradeDirection::BuyWithNative, false, false, Some(half_pct)),
            50
        );
        assert_eq!(
            select_slippage_bps(TradeDirection::BuyWithNative, false, false, None),
            300
        );
    }

    #[test]
    fn test_entry_defaults_low() {
        assert_eq!(
            select_slippage_bps(TradeDirection::TokenToToken, false, false, None),
            100
        );
        let two_pct = Decimal::from(2);
        assert_eq!(
            select_slippage_bps(TradeDirection::TokenToToken, false, false, Some(two_pct)),
            200
        );
    }

    #[test]
    fn test_hint_clamped_to_max() {
        let huge = Decimal::from(500); // 500% => 50_000 bps, clamp to 10_000
        assert_eq!(
            select_slippage_bps(TradeDirection::BuyWithNative, false, false, Some(huge)),
            10_000
        );

        // Past u16 range entirely: still the ceiling, never the default
        let absurd = Decimal::from(1_000_000);
        assert_eq!(
            select_slippage_bps(TradeDirection::BuyWithNative, false, false, Some(absurd)),
            10_000
        );
    }

    #[test]
    fn test_high_risk_heuristic() {
        assert!(is_high_risk_mint(PUMP_MINT));
        assert!(!is_high_risk_mint(TOKEN_MINT));
    }
}
