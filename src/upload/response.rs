//! Normalization of the loosely-shaped JSON the attachment endpoint returns.
//!
//! The backend has grown several spellings for the same concepts. All shape
//! checks live here so the orchestrator only deals with a reference or an
//! error message.

use crate::error::TransportError;
use serde_json::Value;

/// Lookup order for the identifier of a stored attachment.
pub const REFERENCE_FIELDS: &[&str] = &[
    "id",
    "archivo_id",
    "adjunto_id",
    "file_id",
    "data.id",
    "data.archivo_id",
    "ruta",
    "path",
    "url",
];

/// Lookup order for a human-readable error message.
pub const MESSAGE_FIELDS: &[&str] = &["message", "mensaje", "error", "error.message", "detail"];

fn lookup<'a>(body: &'a Value, dotted: &str) -> Option<&'a Value> {
    dotted
        .split('.')
        .try_fold(body, |value, key| value.get(key))
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub fn extract_reference(body: &Value) -> Option<String> {
    REFERENCE_FIELDS
        .iter()
        .find_map(|field| lookup(body, field).and_then(as_text))
}

pub fn extract_error_message(body: &Value) -> Option<String> {
    MESSAGE_FIELDS
        .iter()
        .find_map(|field| lookup(body, field).and_then(as_text))
        .or_else(|| {
            body.get("errors")
                .and_then(|errors| errors.get(0))
                .and_then(|first| as_text(first).or_else(|| extract_error_message(first)))
        })
}

/// A 2xx body can still describe a failure.
pub fn is_error_body(body: &Value) -> bool {
    let flag_false = |key: &str| body.get(key).and_then(Value::as_bool) == Some(false);
    flag_false("success")
        || flag_false("ok")
        || body
            .get("status")
            .and_then(Value::as_str)
            .map(|status| status.eq_ignore_ascii_case("error"))
            .unwrap_or(false)
}

/// Turns a 2xx body into the server reference of the stored file.
pub fn into_reference(body: &Value) -> Result<String, TransportError> {
    if is_error_body(body) {
        return Err(TransportError::Rejected(
            extract_error_message(body).unwrap_or_else(|| "upload rejected by server".to_string()),
        ));
    }
    extract_reference(body).ok_or(TransportError::MissingReference)
}
