//! Revert diagnosis
//!
//! Turns the error payload of a failed simulated call into something a human
//! can read. Never fails: the worst case is a generic description.

use alloy::primitives::hex;
use alloy::sol_types::{Revert, SolError};

use crate::chain::SimulationFailure;
use crate::constants::ERROR_STRING_SELECTOR;

/// Returned when the failure carries neither data nor a message
pub const UNKNOWN_FAILURE: &str = "Unknown failure (no revert data or error message)";

/// Best-effort human reason for a failed simulated call
pub fn diagnose(failure: &SimulationFailure) -> String {
    match failure.data.as_deref() {
        Some(data) if !data.is_empty() => decode_revert_data(data),
        _ => failure
            .message
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| UNKNOWN_FAILURE.to_string()),
    }
}

/// Decode `Error(string)` revert data, or describe the raw bytes
pub fn decode_revert_data(data: &[u8]) -> String {
    if data.starts_with(&ERROR_STRING_SELECTOR) {
        if let Ok(revert) = Revert::abi_decode(data) {
            return revert.reason().to_string();
        }
    }

    format!("Reverted with undecodable data: 0x{}", hex::encode(data))
}
