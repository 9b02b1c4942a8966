//! Authenticated HTTP gateway for the storefront backend.
//!
//! Every call is a single attempt: no retries, no timeout, no caching.
//! Responses are classified strictly by status code before any parsing.

use anyhow::Result;
use reqwest::{header, Client, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::auth::{Credentials, RegistrationForm};
use crate::session::Profile;

use super::ApiError;

/// Path of the credential exchange endpoint
pub const LOGIN_PATH: &str = "/login";

/// Path of the account creation endpoint
pub const SIGNUP_PATH: &str = "/signup";

/// Path of the server-side token revocation endpoint
pub const LOGOUT_PATH: &str = "/logout";

/// Path of the current user's profile
pub const PROFILE_PATH: &str = "/profile";

/// The backend wraps payloads as `{"data": ...}`.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct LoginData {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct MessageBody {
    #[serde(default)]
    message: Option<String>,
}

/// HTTP gateway bound to one token snapshot.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiGateway {
    client: Client,
    base_url: String,
    token: String,
}

impl std::fmt::Debug for ApiGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiGateway")
            .field("base_url", &self.base_url)
            .field("has_token", &!self.token.is_empty())
            .finish()
    }
}

impl ApiGateway {
    /// Create a gateway for `base_url` holding `token` (empty for anonymous calls).
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    /// Create a gateway for another token, sharing the connection pool.
    pub fn with_token(&self, token: impl Into<String>) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            token: token.into(),
        }
    }

    /// Replace the token snapshot. The gateway never watches the session
    /// store itself; the page layer calls this when the token changes.
    pub fn on_token_changed(&mut self, token: impl Into<String>) {
        self.token = token.into();
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    fn auth_headers(&self) -> Result<header::HeaderMap, ApiError> {
        let mut headers = header::HeaderMap::new();
        // An empty token sends no Authorization header at all.
        if !self.token.is_empty() {
            let value = header::HeaderValue::from_str(&format!("Bearer {}", self.token))
                .map_err(|_| ApiError::InvalidRequest("token contains invalid characters".to_string()))?;
            headers.insert(header::AUTHORIZATION, value);
        }
        Ok(headers)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    /// Read a successful response body as JSON. An empty body reads as `null`.
    async fn read_json<T: DeserializeOwned>(response: Response, url: &str) -> Result<T, ApiError> {
        let text = response.text().await?;
        let text = if text.trim().is_empty() { "null" } else { text.as_str() };
        serde_json::from_str(text).map_err(|e| {
            warn!(url = url, error = %e, "Failed to parse JSON response");
            ApiError::InvalidResponse(format!("{} from {}", e, url))
        })
    }

    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder, url: &str) -> Result<T, ApiError> {
        let response = request.send().await.map_err(|e| {
            debug!(url = url, error = %e, "Request failed before a response arrived");
            ApiError::Transport(e)
        })?;

        let response = Self::check_response(response).await.map_err(|e| {
            debug!(url = url, error = %e, "Request rejected by server");
            e
        })?;

        Self::read_json(response, url).await
    }

    pub async fn get(&self, path: &str) -> Result<Value, ApiError> {
        self.get_json(path).await
    }

    pub async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Value, ApiError> {
        self.post_json(path, body).await
    }

    pub async fn delete(&self, path: &str) -> Result<Value, ApiError> {
        let url = self.url(path);
        let request = self.client.delete(&url).headers(self.auth_headers()?);
        self.execute(request, &url).await
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.url(path);
        let request = self.client.get(&url).headers(self.auth_headers()?);
        self.execute(request, &url).await
    }

    /// POST `body` as JSON; `.json()` sets `Content-Type: application/json`.
    pub async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.url(path);
        let request = self.client.post(&url).headers(self.auth_headers()?).json(body);
        self.execute(request, &url).await
    }

    // ===== Session endpoints =====

    /// Exchange credentials for an access token. Sent without a bearer token.
    pub async fn authenticate(&self, credentials: &Credentials) -> Result<String, ApiError> {
        let url = self.url(LOGIN_PATH);
        let request = self.client.post(&url).json(credentials);
        let response: Envelope<LoginData> = self.execute(request, &url).await?;

        if response.data.access_token.is_empty() {
            return Err(ApiError::InvalidResponse("empty access token".to_string()));
        }
        Ok(response.data.access_token)
    }

    /// Create an account; returns the server's confirmation message.
    pub async fn register(&self, form: &RegistrationForm) -> Result<String, ApiError> {
        let url = self.url(SIGNUP_PATH);
        let request = self.client.post(&url).json(form);
        let response: MessageBody = self.execute(request, &url).await?;
        Ok(response
            .message
            .unwrap_or_else(|| "Account created".to_string()))
    }

    pub async fn fetch_profile(&self) -> Result<Profile, ApiError> {
        let response: Envelope<Profile> = self.get_json(PROFILE_PATH).await?;
        Ok(response.data)
    }

    /// Ask the server to revoke the current token.
    pub async fn revoke_token(&self) -> Result<(), ApiError> {
        self.delete(LOGOUT_PATH).await.map(|_| ())
    }
}
