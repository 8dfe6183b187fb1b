//! Salesforce integration.
//!
//! # Architecture
//!
//! - [`CredentialSource`] supplies bearer tokens: an OAuth password grant, a
//!   pre-issued token, or either wrapped in an in-memory cache
//! - [`SalesforceClient`] submits `{recordId, decision, userEmail}` to the
//!   configured endpoint and re-fetches the token once when Salesforce
//!   answers 401/403

pub mod auth;
pub mod client;

pub use auth::{
    CachedCredential, CredentialSource, CrmAccessCredential, PasswordGrantProvider,
    StaticCredential, credential_source_from_config,
};
pub use client::{DecisionSubmission, SalesforceClient};

use thiserror::Error;

use crate::retry::{Transient, is_transient_status, is_transient_transport};

/// Errors that can occur when interacting with Salesforce.
#[derive(Debug, Error)]
pub enum SalesforceError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The token endpoint refused to issue a credential.
    #[error("Authentication failed: HTTP {status}: {body}")]
    AuthFailed { status: u16, body: String },

    /// The update endpoint rejected the bearer token.
    #[error("Access token rejected: HTTP {status}: {body}")]
    TokenRejected { status: u16, body: String },

    /// The update endpoint answered with a non-success status.
    #[error("Decision update rejected: HTTP {status}: {body}")]
    UpdateRejected { status: u16, body: String },

    /// A response could not be parsed.
    #[error("Salesforce response error: {0}")]
    Response(String),
}

impl Transient for SalesforceError {
    fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => is_transient_transport(e),
            Self::AuthFailed { status, .. } | Self::UpdateRejected { status, .. } => {
                is_transient_status(*status)
            }
            Self::TokenRejected { .. } | Self::Response(_) => false,
        }
    }
}
