use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};

use crate::error::PikPakError;

/// API root used when `PIKPAK_PLUS_API` is not set
pub const PIKPAK_DEFAULT_BASE: &str = "/api";
/// Environment variable holding the API root
pub const ENV_API_BASE: &str = "PIKPAK_PLUS_API";
/// Environment variable holding the origin a relative API root resolves against
pub const ENV_ORIGIN: &str = "PIKPAK_PLUS_ORIGIN";
/// Content type sent with every request
pub const JSON_CONTENT_TYPE: &str = "application/json;charset=UTF-8";
/// CORS header the backend expects on requests
pub const HDR_ALLOW_ORIGIN: &str = "access-control-allow-origin";

/// Configuration for the PikPak-Plus client
#[derive(Clone, Debug)]
pub struct PikPakConfig {
    api_base: String,
    origin: Option<String>,
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Default for PikPakConfig {
    fn default() -> Self {
        Self {
            api_base: env_non_empty(ENV_API_BASE).unwrap_or_else(|| PIKPAK_DEFAULT_BASE.into()),
            origin: env_non_empty(ENV_ORIGIN),
        }
    }
}

impl PikPakConfig {
    /// Creates a new configuration with default settings
    ///
    /// Attempts to read from environment variables:
    /// - `PIKPAK_PLUS_API` for the API root (defaults to `/api`)
    /// - `PIKPAK_PLUS_ORIGIN` for the origin a relative API root is served from
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API root, absolute (`https://host/api`) or relative (`/api`)
    #[must_use]
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    /// Sets the origin a relative API root resolves against
    #[must_use]
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Returns the configured API root
    #[must_use]
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Returns the configured origin
    #[must_use]
    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }
}

/// Configuration trait for the client
///
/// Implement this trait to point the client at a different backend layout.
pub trait Config: Send + Sync {
    /// Returns HTTP headers to include in every request
    fn headers(&self) -> HeaderMap;

    /// Constructs the full URL for an API path
    ///
    /// # Errors
    ///
    /// Returns an error if no absolute URL can be formed.
    fn url(&self, path: &str) -> Result<String, PikPakError>;
}

impl Config for PikPakConfig {
    fn headers(&self) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
        h.insert(
            HeaderName::from_static(HDR_ALLOW_ORIGIN),
            HeaderValue::from_static("*"),
        );
        h
    }

    fn url(&self, path: &str) -> Result<String, PikPakError> {
        let base = self.api_base.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        let joined = format!("{base}/{path}");

        if joined.starts_with("http://") || joined.starts_with("https://") {
            return Ok(joined);
        }

        match &self.origin {
            Some(origin) => {
                let origin = origin.trim_end_matches('/');
                let rel = joined.trim_start_matches('/');
                Ok(format!("{origin}/{rel}"))
            }
            None => Err(PikPakError::Config(format!(
                "API root {base:?} is relative: set {ENV_API_BASE} to an absolute URL or {ENV_ORIGIN}"
            ))),
        }
    }
}
