//! Client-side session token expiry check.
//!
//! This is advisory only: the signature segment is never inspected, so a
//! forged token with a future `exp` passes. The backend remains the authority.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, Engine, GeneralPurpose, GeneralPurposeConfig};
use chrono::Utc;
use serde_json::Value;

use crate::error::PikPakError;
use crate::types::SizeValue;

/// Standard alphabet, padding optional, stray trailing bits ignored
const LENIENT_STANDARD: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Whether `token` is present, decodable, and not past its `exp`.
///
/// Never fails: any decode or parse problem reports the token as invalid.
#[must_use]
pub fn is_token_valid(token: Option<&str>) -> bool {
    is_token_valid_at(token, Utc::now().timestamp())
}

/// [`is_token_valid`] against an explicit clock (Unix seconds)
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn is_token_valid_at(token: Option<&str>, now: i64) -> bool {
    let Some(token) = token.filter(|t| !t.is_empty()) else {
        return false;
    };

    match expiry_claim(token) {
        // NaN never compares below the clock
        Ok(Some(exp)) => exp.is_nan() || exp >= now as f64,
        Ok(None) => true,
        Err(e) => {
            tracing::debug!("Treating session token as invalid: {e}");
            false
        }
    }
}

/// The `exp` claim of the token's first segment as a number.
///
/// `None` when the claim is unset: missing, `null`, `false`, `""`, or a
/// numeric `0`/`NaN`. Anything else is coerced, so `"0"` and `[]` become 0
/// and objects become `NaN`.
fn expiry_claim(token: &str) -> Result<Option<f64>, PikPakError> {
    let segment = token.split('.').next().unwrap_or_default();
    let decoded = LENIENT_STANDARD
        .decode(segment.trim())
        .map_err(|e| PikPakError::Serde(format!("token segment is not base64: {e}")))?;
    let claims: Value = serde_json::from_slice(&decoded)
        .map_err(|e| PikPakError::Serde(format!("token segment is not JSON: {e}")))?;

    let exp = match claims {
        Value::Null => return Err(PikPakError::Serde("token claims are null".into())),
        Value::Object(mut map) => map.remove("exp"),
        _ => None,
    };

    Ok(match exp {
        None | Some(Value::Null | Value::Bool(false)) => None,
        Some(Value::Number(n)) => n.as_f64().filter(|e| *e != 0.0 && !e.is_nan()),
        Some(Value::String(s)) if s.is_empty() => None,
        Some(Value::Bool(true)) => Some(1.0),
        Some(Value::Object(_)) => Some(f64::NAN),
        Some(other) => Some(SizeValue::Text(claim_text(&other)).to_number()),
    })
}

/// String form of a claim value, with arrays joined by `,`
fn claim_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(claim_text).collect::<Vec<_>>().join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}
