//! Wire access to the auth endpoints.
//!
//! The refresh credential travels as an HTTP-only cookie kept in the
//! `reqwest` cookie jar of [`HttpTransport`]. Nothing in this crate reads or
//! writes it; it simply rides along on refresh/logout requests.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use capstone_auth::CurrentUser;

use crate::config::ClientConfig;
use crate::error::TransportError;

/// Login form input.
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub identifier: String,
    pub secret: String,
}

impl Credentials {
    pub fn new(identifier: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            secret: secret.into(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.identifier.trim().is_empty() || self.secret.is_empty()
    }
}

impl core::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Credentials")
            .field("identifier", &self.identifier)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Body of a successful login or refresh.
///
/// `user` is optional on the wire so that a token-without-user answer can be
/// detected and handled instead of failing to decode.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub access_token: String,
    #[serde(default)]
    pub user: Option<CurrentUser>,
}

impl core::fmt::Debug for AuthResponse {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AuthResponse")
            .field("access_token", &"<redacted>")
            .field("user", &self.user)
            .finish()
    }
}

/// The three auth exchanges the session manager needs.
#[async_trait]
pub trait AuthTransport: Send + Sync {
    async fn login(&self, credentials: &Credentials) -> Result<AuthResponse, TransportError>;

    /// Present the channel-held refresh credential.
    async fn refresh(&self) -> Result<AuthResponse, TransportError>;

    /// Ask the server to revoke the channel-held refresh credential.
    async fn logout(&self) -> Result<(), TransportError>;
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
}

/// `reqwest`-backed transport with a cookie store.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    config: ClientConfig,
}

impl HttpTransport {
    pub fn new(config: ClientConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(config.timeout)
            .build()
            .map_err(|e| TransportError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// GET a protected JSON resource with the given access token.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str, access_token: &str) -> Result<T, TransportError> {
        let resp = self
            .client
            .get(self.config.url(path))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(network)?;
        let resp = ensure_success(resp).await?;
        resp.json().await.map_err(|e| TransportError::Decode(e.to_string()))
    }

    async fn post_auth(&self, path: &str, credentials: Option<&Credentials>) -> Result<reqwest::Response, TransportError> {
        let mut req = self.client.post(self.config.url(path));
        if let Some(credentials) = credentials {
            req = req.json(credentials);
        }
        let resp = req.send().await.map_err(network)?;
        ensure_success(resp).await
    }
}

#[async_trait]
impl AuthTransport for HttpTransport {
    async fn login(&self, credentials: &Credentials) -> Result<AuthResponse, TransportError> {
        let resp = self.post_auth(&self.config.endpoints.login, Some(credentials)).await?;
        resp.json().await.map_err(|e| TransportError::Decode(e.to_string()))
    }

    async fn refresh(&self) -> Result<AuthResponse, TransportError> {
        let resp = self.post_auth(&self.config.endpoints.refresh, None).await?;
        resp.json().await.map_err(|e| TransportError::Decode(e.to_string()))
    }

    async fn logout(&self) -> Result<(), TransportError> {
        self.post_auth(&self.config.endpoints.logout, None).await?;
        Ok(())
    }
}

fn network(e: reqwest::Error) -> TransportError {
    TransportError::Network(e.to_string())
}

async fn ensure_success(resp: reqwest::Response) -> Result<reqwest::Response, TransportError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let text = resp.text().await.unwrap_or_default();
    let (code, message) = match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) => (body.error, body.message.unwrap_or_default()),
        Err(_) => (None, text),
    };
    Err(TransportError::rejected(status.as_u16(), code, message))
}
