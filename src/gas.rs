//! Forced gas allowance
//!
//! Every transfer is sent with a gas limit one unit below what it needs, so it
//! is included in a block and then runs out of gas.

use crate::constants::FALLBACK_GAS_LIMIT;

/// How the forced allowance was derived
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GasSource {
    /// One unit below the node's estimate
    Estimated { estimate: u64 },
    /// Estimation failed; fixed minimal allowance
    Fallback,
}

/// Compute the deliberately insufficient gas limit from an estimation result
pub fn forced_gas_limit<E>(estimate: &Result<u64, E>) -> (u64, GasSource) {
    match estimate {
        Ok(estimate) if *estimate > 1 => (estimate - 1, GasSource::Estimated { estimate: *estimate }),
        Ok(estimate) => (*estimate, GasSource::Estimated { estimate: *estimate }),
        Err(_) => (FALLBACK_GAS_LIMIT, GasSource::Fallback),
    }
}
