use alloy_primitives::U256;
use std::str::FromStr;

use crate::platforms::PlatformError;

/// Parse a decimal amount string into base units - no floating point.
pub fn parse_amount_safe(amount: &str, decimals: u8) -> Result<U256, PlatformError> {
    let amount = amount.trim();
    if amount.is_empty() {
        return Err(PlatformError::InvalidAmount("Empty amount".into()));
    }

    let parts: Vec<&str> = amount.split('.').collect();
    if parts.len() > 2 {
        return Err(PlatformError::InvalidAmount(format!(
            "Multiple decimal points in {}",
            amount
        )));
    }

    let whole_str = if parts[0].is_empty() { "0" } else { parts[0] };
    if !whole_str.chars().all(|c| c.is_ascii_digit()) {
        return Err(PlatformError::InvalidAmount(format!("Invalid whole number: {}", amount)));
    }
    let whole = U256::from_str(whole_str)
        .map_err(|e| PlatformError::InvalidAmount(format!("Invalid whole number: {}", e)))?;

    let fraction = match parts.get(1) {
        Some(decimal_str) if !decimal_str.is_empty() => {
            if decimal_str.len() > decimals as usize {
                return Err(PlatformError::InvalidAmount("Too many decimal places".into()));
            }
            if !decimal_str.chars().all(|c| c.is_ascii_digit()) {
                return Err(PlatformError::InvalidAmount(format!(
                    "Invalid decimal part: {}",
                    amount
                )));
            }
            let padded = format!("{:0<width$}", decimal_str, width = decimals as usize);
            U256::from_str(&padded)
                .map_err(|e| PlatformError::InvalidAmount(format!("Invalid decimal part: {}", e)))?
        }
        _ => U256::ZERO,
    };

    let multiplier = U256::from(10u64).pow(U256::from(decimals));
    whole
        .checked_mul(multiplier)
        .and_then(|scaled| scaled.checked_add(fraction))
        .ok_or_else(|| PlatformError::InvalidAmount(format!("Amount overflows: {}", amount)))
}

/// Base units as a decimal string, trailing fractional zeros dropped.
pub fn format_amount_safe(amount: U256, decimals: u8) -> String {
    let digits = amount.to_string();
    let scale = usize::from(decimals);
    if scale == 0 {
        return digits;
    }
    let padded = format!("{:0>width$}", digits, width = scale + 1);
    let (whole, fraction) = padded.split_at(padded.len() - scale);
    match fraction.trim_end_matches('0') {
        "" => whole.to_string(),
        fraction => format!("{}.{}", whole, fraction),
    }
}

/// Profile ids and token ids arrive as decimal or `0x` hex strings.
pub fn parse_u256(value: &str) -> Result<U256, PlatformError> {
    U256::from_str(value.trim())
        .map_err(|_| PlatformError::InvalidInput(format!("Not an unsigned integer: {}", value)))
}
