use reqwest::header::{AUTHORIZATION, HeaderValue};
use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::config::{Config, PikPakConfig};
use crate::error::PikPakError;
use crate::session::Session;
use crate::types::SizeValue;

/// Body key carrying the selected server
pub const SERVER_NUMBER_FIELD: &str = "server_number";

/// PikPak-Plus API client
///
/// Every request is authenticated from the [`Session`]'s `auth` cookie and
/// scoped to its selected server.
#[derive(Debug, Clone)]
pub struct Client<C: Config> {
    http: reqwest::Client,
    config: C,
    session: Session,
}

impl Client<PikPakConfig> {
    /// Creates a client configured from the environment
    ///
    /// - `PIKPAK_PLUS_API` for the API root
    /// - `PIKPAK_PLUS_ORIGIN` for resolving a relative API root
    #[must_use]
    pub fn new(session: Session) -> Self {
        Self::with_config(PikPakConfig::new(), session)
    }
}

impl<C: Config> Client<C> {
    /// Creates a client with the given configuration.
    ///
    /// The transport keeps reqwest's defaults: no request timeout.
    #[must_use]
    pub fn with_config(config: C, session: Session) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            session,
        }
    }

    /// Replaces the HTTP client with a custom one
    #[must_use]
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// Returns a reference to the client's configuration
    #[must_use]
    pub const fn config(&self) -> &C {
        &self.config
    }

    /// Returns the session requests are authenticated from
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Sends `METHOD <base>/<path>` with `body` plus the selected
    /// `server_number`.
    ///
    /// A missing body is sent as `{"server_number": ...}` alone. The server
    /// number is the leading integer of the selected server id, or `null`.
    ///
    /// # Errors
    ///
    /// Returns [`PikPakError::Config`] for an unknown method, a non-object
    /// body or an unresolvable URL; [`PikPakError::Reqwest`] on transport
    /// failure; [`PikPakError::Api`] for a non-2xx response. Every failure is
    /// logged before it is returned.
    pub async fn make_request<B>(
        &self,
        path: &str,
        method: &str,
        body: Option<&B>,
    ) -> Result<ApiResponse, PikPakError>
    where
        B: Serialize + ?Sized,
    {
        let result = self.send(path, method, body).await;
        if let Err(e) = &result {
            tracing::error!(%method, %path, "Error making request: {e}");
        }
        result
    }

    async fn send<B>(
        &self,
        path: &str,
        method: &str,
        body: Option<&B>,
    ) -> Result<ApiResponse, PikPakError>
    where
        B: Serialize + ?Sized,
    {
        let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
            .map_err(|_| PikPakError::Config(format!("invalid HTTP method {method:?}")))?;
        let token = self.session.get_auth_cookie().map(SecretString::from);
        let payload = self.payload(body)?;

        let mut headers = self.config.headers();
        if let Some(token) = &token {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
                .map_err(|_| PikPakError::Config("auth cookie is not a valid header value".into()))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let url = self.config.url(path)?;
        tracing::debug!(%method, %url, "Sending request");

        let response = self
            .http
            .request(method, url)
            .headers(headers)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?.to_vec();

        if status.is_success() {
            return Ok(ApiResponse { status, body });
        }

        Err(crate::error::deserialize_api_error(status, &body))
    }

    fn payload<B>(&self, body: Option<&B>) -> Result<Map<String, Value>, PikPakError>
    where
        B: Serialize + ?Sized,
    {
        let mut payload = match body.map(serde_json::to_value).transpose() {
            Ok(None | Some(Value::Null)) => Map::new(),
            Ok(Some(Value::Object(map))) => map,
            Ok(Some(other)) => {
                return Err(PikPakError::Config(format!(
                    "request body must be a JSON object, got {other}"
                )));
            }
            Err(e) => return Err(PikPakError::Serde(e.to_string())),
        };

        let server_number = self
            .session
            .get_selected_server()
            .and_then(|id| SizeValue::Text(id).leading_int());
        payload.insert(
            SERVER_NUMBER_FIELD.into(),
            server_number.map_or(Value::Null, Value::from),
        );
        Ok(payload)
    }
}

/// Successful backend response
#[derive(Debug, Clone)]
pub struct ApiResponse {
    status: StatusCode,
    body: Vec<u8>,
}

impl ApiResponse {
    /// HTTP status of the response
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Raw response body
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// The body as JSON: `null` when empty, a JSON string when it is not JSON
    #[must_use]
    pub fn data(&self) -> Value {
        if self.body.is_empty() {
            return Value::Null;
        }
        serde_json::from_slice(&self.body)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&self.body).into_owned()))
    }

    /// Deserializes the body into `T`
    ///
    /// # Errors
    ///
    /// Returns [`PikPakError::Serde`] if the body does not match `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, PikPakError> {
        serde_json::from_slice(&self.body).map_err(|e| crate::error::map_deser(&e, &self.body))
    }
}
