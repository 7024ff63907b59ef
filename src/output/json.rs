//! JSON serialization for estimates and run summaries.

use serde::Serialize;

/// Serialize a result (e.g. [`VtEstimate`](crate::VtEstimate)) to a compact
/// JSON string.
///
/// # Errors
///
/// Returns an error if serialization fails. Non-finite floats such as an
/// infinite `n_eff` are written as `null`.
pub fn to_json<T: Serialize>(result: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(result)
}

/// Serialize a result to a pretty-printed JSON string.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn to_json_pretty<T: Serialize>(result: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(result)
}
