//! Constants and unit conversion for token transfers

use alloy::primitives::utils::{parse_units, ParseUnits};
use alloy::primitives::U256;
use std::time::Duration;

use crate::error::TransferError;

/// Decimal precision assumed when the token does not answer `decimals()`
pub const DEFAULT_DECIMALS: u8 = 18;

/// Display symbol used when the token does not answer `symbol()`
pub const DEFAULT_SYMBOL: &str = "TOKEN";

/// Gas allowance used when estimation fails; far below what a transfer needs
pub const FALLBACK_GAS_LIMIT: u64 = 45_000;

/// Interval between lifecycle polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// How long a completed session stays replayable
pub const DEFAULT_SESSION_RETENTION: Duration = Duration::from_secs(600);

/// Block explorer used for transaction links
pub const DEFAULT_EXPLORER_URL: &str = "https://etherscan.io";

/// Selector of the standard `Error(string)` revert payload
pub const ERROR_STRING_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

/// Scale a human decimal amount (e.g. "12.5") to the token's smallest unit
///
/// Rejects negative values and amounts with more fractional digits than the
/// token supports, rather than silently truncating them.
pub fn scale_amount(amount: &str, decimals: u8) -> Result<U256, TransferError> {
    let amount = amount.trim();
    let invalid = |reason: &str| {
        TransferError::ConversionFailure(format!("Invalid amount '{amount}': {reason}"))
    };

    // Trailing zeros carry no precision, so "1.500" fits a 1-decimal token
    let normalized = match amount.split_once('.') {
        Some((whole, fraction)) => {
            let fraction = fraction.trim_end_matches('0');
            if fraction.len() > decimals as usize {
                return Err(invalid(&format!("more than {decimals} decimal places")));
            }
            if fraction.is_empty() {
                whole.to_string()
            } else {
                format!("{whole}.{fraction}")
            }
        }
        None => amount.to_string(),
    };

    match parse_units(&normalized, decimals) {
        Ok(ParseUnits::U256(value)) => Ok(value),
        Ok(ParseUnits::I256(_)) => Err(invalid("amount must not be negative")),
        Err(e) => Err(invalid(&e.to_string())),
    }
}

/// Parse a gas price given in gwei into wei
pub fn scale_gas_price(gwei: &str) -> Result<u128, TransferError> {
    let gwei = gwei.trim();
    let invalid = |reason: String| {
        TransferError::ConversionFailure(format!("Invalid gas price '{gwei}': {reason}"))
    };

    match parse_units(gwei, "gwei") {
        Ok(ParseUnits::U256(wei)) => {
            u128::try_from(wei).map_err(|_| invalid("value too large".to_string()))
        }
        Ok(ParseUnits::I256(_)) => Err(invalid("gas price must not be negative".to_string())),
        Err(e) => Err(invalid(e.to_string())),
    }
}
