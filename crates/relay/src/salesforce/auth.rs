//! Salesforce credential sources.
//!
//! Handles the OAuth resource-owner password grant and the optional
//! in-memory token cache.

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use super::SalesforceError;
use crate::config::{CredentialConfig, HttpConfig, PasswordGrantConfig};
use crate::retry::RetryPolicy;

/// Bearer token for the Salesforce update endpoint. Expiry is unknown.
#[derive(Debug, Clone)]
pub struct CrmAccessCredential(SecretString);

impl CrmAccessCredential {
    /// Wrap a raw token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    /// The raw token, for the `Authorization` header only.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl From<SecretString> for CrmAccessCredential {
    fn from(secret: SecretString) -> Self {
        Self(secret)
    }
}

/// Supplies bearer tokens for Salesforce.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CredentialSource: Send + Sync {
    /// Obtain a credential.
    ///
    /// # Errors
    ///
    /// Returns `SalesforceError::AuthFailed` if no credential can be issued.
    async fn credential(&self) -> Result<CrmAccessCredential, SalesforceError>;

    /// Forget any cached credential after Salesforce rejected it.
    async fn invalidate(&self) {}
}

// =============================================================================
// Password Grant
// =============================================================================

/// Response from the OAuth token endpoint.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Fetches a fresh token with the OAuth password grant on every call.
#[derive(Clone)]
pub struct PasswordGrantProvider {
    client: reqwest::Client,
    config: PasswordGrantConfig,
    retry: RetryPolicy,
}

impl std::fmt::Debug for PasswordGrantProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordGrantProvider")
            .field("config", &self.config)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl PasswordGrantProvider {
    /// Create a provider.
    #[must_use]
    pub const fn new(
        client: reqwest::Client,
        config: PasswordGrantConfig,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            client,
            config,
            retry,
        }
    }

    async fn request_token(&self) -> Result<CrmAccessCredential, SalesforceError> {
        let form = [
            ("grant_type", "password"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.expose_secret()),
            ("username", self.config.username.as_str()),
            ("password", self.config.password.expose_secret()),
        ];

        let response = self
            .client
            .post(&self.config.token_url)
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SalesforceError::AuthFailed {
                status: status.as_u16(),
                body,
            });
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| SalesforceError::Response(e.to_string()))?;

        Ok(CrmAccessCredential::new(token.access_token))
    }
}

#[async_trait]
impl CredentialSource for PasswordGrantProvider {
    #[instrument(skip(self), fields(username = %self.config.username))]
    async fn credential(&self) -> Result<CrmAccessCredential, SalesforceError> {
        let result = self
            .retry
            .run("salesforce.token", || self.request_token())
            .await;

        match &result {
            Ok(_) => debug!("Salesforce token issued"),
            Err(e) => warn!(error = %e, "Salesforce token request failed"),
        }

        result
    }
}

// =============================================================================
// Static Token
// =============================================================================

/// A pre-issued token that is never refreshed.
#[derive(Debug, Clone)]
pub struct StaticCredential(CrmAccessCredential);

impl StaticCredential {
    /// Wrap a pre-issued token.
    #[must_use]
    pub fn new(token: SecretString) -> Self {
        Self(CrmAccessCredential::from(token))
    }
}

#[async_trait]
impl CredentialSource for StaticCredential {
    async fn credential(&self) -> Result<CrmAccessCredential, SalesforceError> {
        Ok(self.0.clone())
    }
}

// =============================================================================
// Cache
// =============================================================================

/// Reuses a credential across relays until Salesforce rejects it.
pub struct CachedCredential {
    inner: Arc<dyn CredentialSource>,
    token: RwLock<Option<CrmAccessCredential>>,
}

impl std::fmt::Debug for CachedCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedCredential").finish_non_exhaustive()
    }
}

impl CachedCredential {
    /// Wrap `inner` with an empty cache.
    #[must_use]
    pub fn new(inner: Arc<dyn CredentialSource>) -> Self {
        Self {
            inner,
            token: RwLock::new(None),
        }
    }
}

#[async_trait]
impl CredentialSource for CachedCredential {
    async fn credential(&self) -> Result<CrmAccessCredential, SalesforceError> {
        if let Some(token) = self.token.read().await.as_ref() {
            return Ok(token.clone());
        }

        let mut slot = self.token.write().await;
        // Another relay may have filled the slot while we waited
        if let Some(token) = slot.as_ref() {
            return Ok(token.clone());
        }

        let token = self.inner.credential().await?;
        *slot = Some(token.clone());
        debug!("Salesforce token cached");
        Ok(token)
    }

    async fn invalidate(&self) {
        *self.token.write().await = None;
        self.inner.invalidate().await;
        debug!("Cached Salesforce token invalidated");
    }
}

/// Build the credential source described by configuration.
///
/// # Errors
///
/// Returns error if the HTTP client cannot be built.
pub fn credential_source_from_config(
    credential: &CredentialConfig,
    http: &HttpConfig,
) -> Result<Arc<dyn CredentialSource>, SalesforceError> {
    let source: Arc<dyn CredentialSource> = match credential {
        CredentialConfig::Static(token) => Arc::new(StaticCredential::new(token.clone())),
        CredentialConfig::PasswordGrant(grant) => {
            let provider: Arc<dyn CredentialSource> = Arc::new(PasswordGrantProvider::new(
                http.build_client()?,
                grant.clone(),
                http.retry,
            ));
            if grant.cache_token {
                Arc::new(CachedCredential::new(provider))
            } else {
                provider
            }
        }
    };

    Ok(source)
}
