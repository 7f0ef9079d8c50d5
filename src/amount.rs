//! Amount handling utilities for token decimals

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::types::{ExecutorError, Result};

/// 10^decimals as u64. Decimals come from external metadata, so an
/// out-of-range value must surface as a calculation error, not a panic.
fn pow10(decimals: u8) -> Result<u64> {
    10u64.checked_pow(decimals as u32).ok_or_else(|| {
        ExecutorError::Calculation(format!("decimals {} out of range for unit scaling", decimals))
    })
}

/// Convert UI amount (human readable) to raw amount (u64), flooring
///
/// Truncates toward zero, never rounds up - rounding up could authorize
/// selling more than the wallet holds.
pub fn to_raw_amount(ui_amount: Decimal, decimals: u8) -> Result<u64> {
    if ui_amount < Decimal::ZERO {
        return Err(ExecutorError::Calculation(format!(
            "amount cannot be negative: {}",
            ui_amount
        )));
    }

    let multiplier = Decimal::from(pow10(decimals)?);
    let raw = (ui_amount * multiplier).trunc();

    raw.to_u64().ok_or_else(|| {
        ExecutorError::Calculation(format!(
            "amount {} with {} decimals overflows u64",
            ui_amount, decimals
        ))
    })
}

/// Convert raw amount (u64) to UI amount (human readable)
pub fn from_raw_amount(raw_amount: u64, decimals: u8) -> Result<Decimal> {
    let divisor = Decimal::from(pow10(decimals)?);
    Ok(Decimal::from(raw_amount) / divisor)
}
