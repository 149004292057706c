use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::spotify::types::TokenResponse;

const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
/// Tokens are treated as expired this long before their real expiry.
const TOKEN_EXPIRY_BUFFER: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("token exchange rejected with status {status}: {body}")]
    Rejected {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("failed to send token request: {0}")]
    FailedToSendRequest(#[source] reqwest::Error),
    #[error("failed to parse token response: {0}")]
    FailedToParseResponse(#[source] reqwest::Error),
}

/// Client-credentials auth against the catalog's token endpoint.
///
/// The cached token is shared across concurrent sync runs. The lock is not
/// held across the exchange, so two callers that both see an expired cache
/// may refresh twice; the second refresh just overwrites the first.
pub struct AuthClient {
    client_id: String,
    client_secret: String,
    http: reqwest::Client,
    cache: Mutex<Option<CachedToken>>,
}

impl AuthClient {
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self {
            client_id,
            client_secret,
            http: reqwest::Client::new(),
            cache: Mutex::new(None),
        }
    }

    /// Return the cached token, or exchange client credentials for a new one.
    pub async fn access_token(&self) -> Result<String, AuthError> {
        if let Some(token) = self.cached() {
            return Ok(token);
        }

        let mut params = HashMap::new();
        params.insert("grant_type", "client_credentials");

        let response = self
            .http
            .post(TOKEN_URL)
            // Serializes to x-www-form-urlencoded and sets the content type.
            .form(&params)
            .header(
                "Authorization",
                format!(
                    "Basic {}",
                    STANDARD.encode(format!("{}:{}", self.client_id, self.client_secret))
                ),
            )
            .send()
            .await
            .map_err(AuthError::FailedToSendRequest)?;

        if !response.status().is_success() {
            return Err(AuthError::Rejected {
                status: response.status(),
                body: response
                    .text()
                    .await
                    .unwrap_or("Failed to get error text".to_string()),
            });
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(AuthError::FailedToParseResponse)?;

        self.store(&token);
        Ok(token.access_token)
    }

    fn cached(&self) -> Option<String> {
        let cache = self.cache.lock().expect("token cache lock poisoned");
        cache
            .as_ref()
            .filter(|token| Instant::now() < token.expires_at)
            .map(|token| token.access_token.clone())
    }

    fn store(&self, token: &TokenResponse) {
        let lifetime = Duration::from_secs(token.expires_in)
            .saturating_sub(TOKEN_EXPIRY_BUFFER);
        let cached = CachedToken {
            access_token: token.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        };
        *self.cache.lock().expect("token cache lock poisoned") = Some(cached);
    }
}
