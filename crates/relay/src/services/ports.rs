//! Collaborator traits the decision relay depends on.

use async_trait::async_trait;
use serde_json::Value;

use crate::salesforce::{DecisionSubmission, SalesforceError};
use crate::slack::{MessageRef, SlackError};

/// The chat platform the approval request was posted to.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// Email on the user's profile, if any.
    async fn user_email(&self, user_id: &str) -> Result<Option<String>, SlackError>;

    /// Replace a message's blocks.
    async fn update_message(
        &self,
        message: &MessageRef,
        blocks: &[Value],
        text: &str,
    ) -> Result<(), SlackError>;

    /// Post a reply in a message's thread.
    async fn post_thread_message(&self, thread: &MessageRef, text: &str) -> Result<(), SlackError>;
}

/// The CRM that owns the approval state.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CrmGateway: Send + Sync {
    /// Apply a decision to its record.
    async fn submit_decision(&self, submission: &DecisionSubmission) -> Result<(), SalesforceError>;
}
