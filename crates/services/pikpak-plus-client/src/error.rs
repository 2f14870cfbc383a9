use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when using the PikPak-Plus client helpers
#[derive(Debug, Error)]
pub enum PikPakError {
    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Reqwest(#[from] reqwest::Error),

    /// Non-2xx response returned by the backend
    #[error("API error: {0:?}")]
    Api(ApiErrorObject),

    /// Configuration or request-shape error
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serde(String),

    /// Persistent store or cookie jar failure
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Error payload captured from a failed backend response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorObject {
    /// HTTP status code
    #[serde(default)]
    pub status_code: Option<u16>,
    /// Human-readable error message
    #[serde(default, alias = "detail", alias = "error_description")]
    pub message: String,
    /// Error type string
    #[serde(default)]
    pub error: Option<String>,
}

impl ApiErrorObject {
    /// Returns the HTTP status code as a [`StatusCode`], if it was recorded
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        self.status_code
            .and_then(|code| StatusCode::from_u16(code).ok())
    }
}

impl From<std::io::Error> for PikPakError {
    fn from(e: std::io::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

impl<E: std::fmt::Display> From<atomicwrites::Error<E>> for PikPakError {
    fn from(e: atomicwrites::Error<E>) -> Self {
        Self::Storage(e.to_string())
    }
}

/// Maps a serde deserialization error to a `PikPakError` with context
#[must_use]
pub fn map_deser(e: &serde_json::Error, body: &[u8]) -> PikPakError {
    let snippet = String::from_utf8_lossy(&body[..body.len().min(400)]).to_string();
    PikPakError::Serde(format!("{e}: {snippet}"))
}

/// Deserializes an API error from the response body
///
/// Attempts to parse the error as JSON, falling back to plain text on failure.
#[must_use]
pub fn deserialize_api_error(status: StatusCode, body: &[u8]) -> PikPakError {
    let status_code = Some(status.as_u16());

    if let Ok(mut obj) = serde_json::from_slice::<ApiErrorObject>(body) {
        obj.status_code = status_code;
        if obj.message.is_empty() {
            obj.message = status
                .canonical_reason()
                .unwrap_or_default()
                .to_string();
        }
        return PikPakError::Api(obj);
    }

    // Proxies return HTML/plain text on 5xx; cap body to avoid log/memory bloat
    PikPakError::Api(ApiErrorObject {
        status_code,
        message: String::from_utf8_lossy(&body[..body.len().min(400)]).into_owned(),
        error: Some(format!("http_{}", status.as_u16())),
    })
}
