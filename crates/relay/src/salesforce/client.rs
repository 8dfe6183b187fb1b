//! Salesforce decision endpoint client.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, instrument, warn};

use approval_relay_core::{ActorDisplay, CrmDecisionStatus, RecordId};

use super::SalesforceError;
use super::auth::{CredentialSource, CrmAccessCredential};
use crate::config::{HttpConfig, SalesforceConfig};
use crate::retry::RetryPolicy;
use crate::services::CrmGateway;

/// Body of the decision update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionSubmission {
    /// Case id, trimmed.
    pub record_id: String,
    /// `Approved` or `Rejected`.
    pub decision: CrmDecisionStatus,
    /// Reviewer email or fallback label, trimmed.
    pub user_email: String,
}

impl DecisionSubmission {
    /// Build the submission for one decision.
    #[must_use]
    pub fn new(record_id: &RecordId, decision: CrmDecisionStatus, actor: &ActorDisplay) -> Self {
        Self {
            record_id: record_id.as_str().trim().to_string(),
            decision,
            user_email: actor.as_str().trim().to_string(),
        }
    }
}

/// Client for the endpoint that applies approval decisions to Cases.
#[derive(Clone)]
pub struct SalesforceClient {
    client: reqwest::Client,
    api_url: String,
    credentials: Arc<dyn CredentialSource>,
    retry: RetryPolicy,
}

impl std::fmt::Debug for SalesforceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SalesforceClient")
            .field("api_url", &self.api_url)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl SalesforceClient {
    /// Create a new client.
    #[must_use]
    pub fn new(
        client: reqwest::Client,
        api_url: impl Into<String>,
        credentials: Arc<dyn CredentialSource>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            client,
            api_url: api_url.into(),
            credentials,
            retry,
        }
    }

    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built.
    pub fn from_config(
        salesforce: &SalesforceConfig,
        credentials: Arc<dyn CredentialSource>,
        http: &HttpConfig,
    ) -> Result<Self, SalesforceError> {
        Ok(Self::new(
            http.build_client()?,
            salesforce.api_url.clone(),
            credentials,
            http.retry,
        ))
    }

    /// Submit a decision.
    ///
    /// When Salesforce rejects the token, the credential is invalidated,
    /// fetched again and the submission retried once.
    ///
    /// # Errors
    ///
    /// Returns `AuthFailed` if no credential could be obtained,
    /// `TokenRejected` if the fresh token was rejected too, and
    /// `UpdateRejected` for any other non-success status.
    #[instrument(
        skip(self, submission),
        fields(record_id = %submission.record_id, decision = %submission.decision)
    )]
    pub async fn submit_decision(
        &self,
        submission: &DecisionSubmission,
    ) -> Result<(), SalesforceError> {
        let token = self.credentials.credential().await?;

        match self.post(&token, submission).await {
            Err(SalesforceError::TokenRejected { status, .. }) => {
                warn!(status, "Salesforce rejected the access token, refreshing");
                self.credentials.invalidate().await;
                let token = self.credentials.credential().await?;
                self.post(&token, submission).await?;
            }
            other => other?,
        }

        info!("Decision recorded in Salesforce");
        Ok(())
    }

    async fn post(
        &self,
        token: &CrmAccessCredential,
        submission: &DecisionSubmission,
    ) -> Result<(), SalesforceError> {
        self.retry
            .run("salesforce.update", || async {
                let response = self
                    .client
                    .post(&self.api_url)
                    .bearer_auth(token.expose())
                    .json(submission)
                    .send()
                    .await?;

                let status = response.status();
                if status.is_success() {
                    return Ok(());
                }

                let body = response.text().await.unwrap_or_default();
                let status = status.as_u16();
                if status == 401 || status == 403 {
                    Err(SalesforceError::TokenRejected { status, body })
                } else {
                    Err(SalesforceError::UpdateRejected { status, body })
                }
            })
            .await
    }
}

#[async_trait]
impl CrmGateway for SalesforceClient {
    async fn submit_decision(&self, submission: &DecisionSubmission) -> Result<(), SalesforceError> {
        Self::submit_decision(self, submission).await
    }
}
