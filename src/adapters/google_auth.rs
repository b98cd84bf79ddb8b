use crate::domain::ports::TokenProvider;
use crate::utils::error::{ExportError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

pub const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

// Refresh this long before Google says the token expires.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);
const DEFAULT_LIFETIME: Duration = Duration::from_secs(3600);

/// A pre-issued access token.
#[derive(Debug, Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn access_token(&self) -> Result<String> {
        let token = self.0.trim();
        if token.is_empty() {
            return Err(ExportError::auth("Google access token is empty"));
        }
        Ok(token.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct OAuthCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug)]
struct CachedToken {
    token: String,
    expires_at: Instant,
}

/// Exchanges a long-lived refresh token for access tokens, caching each one
/// until shortly before it expires.
#[derive(Debug)]
pub struct RefreshTokenProvider {
    client: Client,
    token_url: String,
    credentials: OAuthCredentials,
    cache: Mutex<Option<CachedToken>>,
}

impl RefreshTokenProvider {
    pub fn new(client: Client, token_url: impl Into<String>, credentials: OAuthCredentials) -> Self {
        Self {
            client,
            token_url: token_url.into(),
            credentials,
            cache: Mutex::new(None),
        }
    }

    fn check_credentials(&self) -> Result<()> {
        let missing: Vec<&str> = [
            ("GOOGLE_CLIENT_ID", &self.credentials.client_id),
            ("GOOGLE_CLIENT_SECRET", &self.credentials.client_secret),
            ("GOOGLE_REFRESH_TOKEN", &self.credentials.refresh_token),
        ]
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ExportError::auth(format!(
                "missing Google OAuth credentials: {}",
                missing.join(", ")
            )))
        }
    }

    async fn refresh(&self) -> Result<CachedToken> {
        self.check_credentials()?;
        tracing::debug!("Refreshing Google access token");

        let response = self
            .client
            .post(&self.token_url)
            .form(&[
                ("client_id", self.credentials.client_id.as_str()),
                ("client_secret", self.credentials.client_secret.as_str()),
                ("refresh_token", self.credentials.refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|e| ExportError::auth(format!("token request failed: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ExportError::auth(format!("token response unreadable: {}", e)))?;
        if !status.is_success() {
            return Err(ExportError::auth(format!(
                "failed to refresh Google access token ({}): {}",
                status,
                text.trim()
            )));
        }

        let parsed: TokenResponse = serde_json::from_str(&text)
            .map_err(|e| ExportError::auth(format!("unexpected token response: {}", e)))?;
        if parsed.access_token.trim().is_empty() {
            return Err(ExportError::auth("token endpoint returned an empty access token"));
        }

        let lifetime = parsed
            .expires_in
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_LIFETIME);
        Ok(CachedToken {
            token: parsed.access_token,
            expires_at: Instant::now() + lifetime.saturating_sub(EXPIRY_MARGIN),
        })
    }
}

#[async_trait]
impl TokenProvider for RefreshTokenProvider {
    async fn access_token(&self) -> Result<String> {
        let mut cache = self.cache.lock().await;
        if let Some(cached) = cache.as_ref() {
            if Instant::now() < cached.expires_at {
                return Ok(cached.token.clone());
            }
        }

        let fresh = self.refresh().await?;
        let token = fresh.token.clone();
        *cache = Some(fresh);
        Ok(token)
    }
}
