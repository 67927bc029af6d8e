//! Shared HTTP utilities for the record-store workspace.
//!
//! Provides the JSON error bodies, id generation and time formatting used by
//! api-server and store-cli.

use chrono::{DateTime, SecondsFormat, Utc};
use std::time::SystemTime;

// ============================================================================
// JSON Response Helpers (framework-agnostic)
// ============================================================================

/// Create a structured error JSON with a default message based on the code.
///
/// Returns: `{"error": {"code": "<code>", "message": "<default message>"}}`
pub fn json_err(code: &str) -> serde_json::Value {
    let message = match code {
        "not_found" => "Resource not found",
        "bad_request" => "Bad request",
        "unknown_collection" => "Unknown collection",
        "storage" => "Local storage failure",
        "error" | "internal" => "Internal server error",
        _ => code, // Fallback to code as message for unknown codes
    };
    serde_json::json!({"error": {"code": code, "message": message}})
}

/// Create a structured error JSON with a custom message.
///
/// Returns: `{"error": {"code": "<code>", "message": "<message>"}}`
pub fn json_error_with_message(code: &str, message: &str) -> serde_json::Value {
    serde_json::json!({"error": {"code": code, "message": message}})
}

// ============================================================================
// Record helpers
// ============================================================================

/// Generate a record id with a short uppercase prefix, e.g. `BK-18d4f1234_a3b2c1d4`.
///
/// Combines timestamp with a scrambled component; unique enough for a
/// single-user demo, not a global identifier.
pub fn generate_id(prefix: &str) -> String {
    use std::time::UNIX_EPOCH;

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);

    let random: u32 = ((timestamp ^ 0xDEAD_BEEF) as u32)
        .wrapping_mul(1103515245)
        .wrapping_add(12345);

    format!("{}-{:x}_{:08x}", prefix, timestamp, random)
}

// ============================================================================
// Time Utilities
// ============================================================================

/// Convert SystemTime to RFC3339 string (seconds precision, UTC).
pub fn system_time_to_rfc3339(t: SystemTime) -> String {
    let dt: DateTime<Utc> = t.into();
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}
