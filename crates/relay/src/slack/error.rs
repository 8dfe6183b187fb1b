//! Slack-related errors.

use thiserror::Error;

use crate::retry::{Transient, is_transient_status, is_transient_transport};

/// Errors that can occur when interacting with Slack.
#[derive(Debug, Error)]
pub enum SlackError {
    /// HTTP request failed before a response arrived.
    #[error("Slack request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Slack answered with a non-success HTTP status.
    #[error("Slack returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Failed to parse response.
    #[error("Slack response error: {0}")]
    Response(String),

    /// Slack API returned `ok: false`.
    #[error("Slack API error: {0}")]
    Api(String),

    /// Invalid webhook signature.
    #[error("Invalid Slack signature: {0}")]
    InvalidSignature(String),

    /// Failed to parse an inbound payload.
    #[error("Invalid Slack payload: {0}")]
    InvalidPayload(String),
}

impl Transient for SlackError {
    fn is_transient(&self) -> bool {
        match self {
            Self::Request(e) => is_transient_transport(e),
            Self::Status { status, .. } => is_transient_status(*status),
            Self::Api(code) => code == "ratelimited",
            Self::Response(_) | Self::InvalidSignature(_) | Self::InvalidPayload(_) => false,
        }
    }
}
