use crate::error::GatewayError;
use async_trait::async_trait;
use std::time::{Duration, Instant};

/// A bearer credential with optional expiry.
#[derive(Clone)]
pub struct CachedToken {
    pub access_token: String,
    expires_at: Option<Instant>,
}

impl CachedToken {
    /// A token without an expiry; never refreshed proactively.
    pub fn permanent(access_token: impl Into<String>) -> Self {
        Self { access_token: access_token.into(), expires_at: None }
    }

    /// A token valid for `lifetime`. Expiry is recorded 60 seconds early so a
    /// refresh happens before the credential actually lapses.
    pub fn expiring(access_token: impl Into<String>, lifetime: Duration) -> Self {
        let padded = lifetime.saturating_sub(Duration::from_secs(60));
        Self { access_token: access_token.into(), expires_at: Some(Instant::now() + padded) }
    }

    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => Instant::now() >= expires_at,
            None => false,
        }
    }
}

impl std::fmt::Debug for CachedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never log credential material.
        write!(f, "CachedToken([REDACTED], expires={:?})", self.expires_at)
    }
}

/// Credential lifecycle of the gateway client.
#[derive(Debug, Clone)]
pub enum AuthState {
    Unauthenticated,
    Authenticated(CachedToken),
    Expired,
}

/// Source of bearer credentials for the gateway.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn fetch_token(&self) -> Result<CachedToken, GatewayError>;
}

/// Fixed token provider for environments where credentials are injected
/// out-of-band (tests, short-lived jobs).
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

#[async_trait]
impl CredentialProvider for StaticTokenProvider {
    async fn fetch_token(&self) -> Result<CachedToken, GatewayError> {
        Ok(CachedToken::permanent(self.token.clone()))
    }
}

/// OAuth2 client-credentials provider against a token endpoint.
#[cfg(feature = "http-transport")]
pub struct ClientCredentialsProvider {
    client_id: String,
    client_secret: Option<String>,
    token_url: String,
    scopes: Vec<String>,
    client: reqwest::Client,
}

#[cfg(feature = "http-transport")]
impl ClientCredentialsProvider {
    pub fn new(client_id: impl Into<String>, token_url: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: None,
            token_url: token_url.into(),
            scopes: Vec::new(),
            client: reqwest::Client::new(),
        }
    }

    #[must_use]
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    #[must_use]
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }
}

#[cfg(feature = "http-transport")]
#[derive(serde::Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[cfg(feature = "http-transport")]
#[async_trait]
impl CredentialProvider for ClientCredentialsProvider {
    async fn fetch_token(&self) -> Result<CachedToken, GatewayError> {
        let mut params = vec![
            ("grant_type", "client_credentials".to_string()),
            ("client_id", self.client_id.clone()),
        ];
        if let Some(secret) = &self.client_secret {
            params.push(("client_secret", secret.clone()));
        }
        if !self.scopes.is_empty() {
            params.push(("scope", self.scopes.join(" ")));
        }

        let response = self
            .client
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| GatewayError::Credential(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Credential(format!(
                "token request failed: {status} - {body}"
            )));
        }

        let token: TokenResponse =
            response.json().await.map_err(|e| GatewayError::Credential(e.to_string()))?;

        Ok(match token.expires_in {
            Some(secs) => CachedToken::expiring(token.access_token, Duration::from_secs(secs)),
            None => CachedToken::permanent(token.access_token),
        })
    }
}
