//! Wire response envelopes.
//!
//! The two protocol generations wrap results differently:
//!
//! | Generation | Success | Error |
//! |------------|---------|-------|
//! | Legacy | `{sessionId, status: 0, value}` | non-zero `status`, message in `value` |
//! | W3C | `{value: ...}` | `value` object with an `error` code field |
//!
//! A non-2xx HTTP status with a decodable envelope still uses the envelope,
//! so the server's structured error code and message win over the bare
//! status line.

// ============================================================================
// Imports
// ============================================================================

use serde_json::Value;

use crate::error::{Error, Result};

use super::commands::ProtocolKind;

// ============================================================================
// Constants
// ============================================================================

/// Key under which the W3C protocol nests element references.
pub const W3C_ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Key under which the legacy protocol nests element references.
pub const LEGACY_ELEMENT_KEY: &str = "ELEMENT";

// ============================================================================
// WireResponse
// ============================================================================

/// A decoded, non-error wire response.
#[derive(Debug, Clone)]
pub struct WireResponse {
    /// Session id, present on legacy responses and session creation.
    pub session_id: Option<String>,

    /// The unwrapped `value` field.
    pub value: Value,
}

// ============================================================================
// Envelope Parsing
// ============================================================================

/// Decodes a wire envelope, mapping protocol errors to typed errors.
///
/// # Errors
///
/// Returns the typed protocol error named by the envelope, or
/// [`Error::UnknownError`] for a non-2xx response without a decodable
/// error shape.
pub fn parse(kind: ProtocolKind, http_status: u16, body: Option<Value>) -> Result<WireResponse> {
    let ok = (200..300).contains(&http_status);

    let Some(body) = body else {
        if ok {
            return Ok(WireResponse {
                session_id: None,
                value: Value::Null,
            });
        }
        return Err(Error::UnknownError {
            code: http_status.to_string(),
            message: "empty response body".into(),
        });
    };

    match kind {
        ProtocolKind::Legacy => parse_legacy(http_status, &body),
        ProtocolKind::W3c => parse_w3c(http_status, &body),
    }
}

/// Decodes a legacy `{sessionId, status, value}` envelope.
fn parse_legacy(http_status: u16, body: &Value) -> Result<WireResponse> {
    let status = body.get("status").and_then(Value::as_u64).unwrap_or(0);
    let value = body.get("value").cloned().unwrap_or(Value::Null);

    if status != 0 {
        return Err(Error::from_legacy_status(status, error_message(&value)));
    }
    if !(200..300).contains(&http_status) {
        return Err(Error::UnknownError {
            code: http_status.to_string(),
            message: error_message(&value),
        });
    }

    Ok(WireResponse {
        session_id: body
            .get("sessionId")
            .and_then(Value::as_str)
            .map(str::to_string),
        value,
    })
}

/// Decodes a W3C `{value}` envelope.
fn parse_w3c(http_status: u16, body: &Value) -> Result<WireResponse> {
    let value = body.get("value").cloned().unwrap_or(Value::Null);

    if let Some(code) = value.get("error").and_then(Value::as_str) {
        return Err(Error::from_wire_code(code, error_message(&value)));
    }
    if !(200..300).contains(&http_status) {
        return Err(Error::UnknownError {
            code: http_status.to_string(),
            message: error_message(&value),
        });
    }

    Ok(WireResponse {
        session_id: None,
        value,
    })
}

/// Extracts the human-readable message from an error value.
fn error_message(value: &Value) -> String {
    match value.get("message").and_then(Value::as_str) {
        Some(message) => message.to_string(),
        None => value.to_string(),
    }
}

// ============================================================================
// Element References
// ============================================================================

/// Extracts an element id from a find-element response value.
///
/// # Errors
///
/// Returns [`Error::UnknownError`] if the value does not carry the
/// generation's element key.
pub fn element_id(kind: ProtocolKind, value: &Value) -> Result<String> {
    let key = match kind {
        ProtocolKind::Legacy => LEGACY_ELEMENT_KEY,
        ProtocolKind::W3c => W3C_ELEMENT_KEY,
    };

    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| Error::UnknownError {
            code: "invalid element response".into(),
            message: value.to_string(),
        })
}

// ============================================================================
// Tests
// ============================================================================
