//! Slack wire types.
//!
//! Outbound blocks are a small typed subset of Block Kit. Inbound message
//! blocks are kept as raw JSON so that whatever the original poster built
//! survives reconciliation untouched.
//!
//! See: <https://api.slack.com/block-kit>

use serde::{Deserialize, Serialize};
use serde_json::Value;

use approval_relay_core::ActorRef;

use super::error::SlackError;

// =============================================================================
// Outbound Blocks
// =============================================================================

/// Block Kit block types the relay writes.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    /// Section block with text.
    Section {
        text: Text,
        #[serde(skip_serializing_if = "Option::is_none")]
        block_id: Option<String>,
    },
}

impl Block {
    /// Serialize into the raw form used by message views.
    #[must_use]
    pub fn into_value(self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Text object type.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Text {
    /// Markdown text (supports formatting).
    Mrkdwn { text: String },
}

impl Text {
    /// Create a markdown text object.
    #[must_use]
    pub fn mrkdwn(text: impl Into<String>) -> Self {
        Self::Mrkdwn { text: text.into() }
    }
}

// =============================================================================
// Message Views
// =============================================================================

/// Location of a posted message.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageRef {
    /// Channel ID.
    pub channel_id: String,
    /// Message timestamp (Slack's message ID).
    pub ts: String,
}

/// A posted message as seen when a button on it was clicked.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessageView {
    /// Channel ID.
    pub channel_id: String,
    /// Message timestamp.
    pub ts: String,
    /// Blocks exactly as Slack delivered them.
    pub blocks: Vec<Value>,
    /// Fallback text of the message, if any.
    pub text: Option<String>,
}

impl ChatMessageView {
    /// Returns where this message lives.
    #[must_use]
    pub fn reference(&self) -> MessageRef {
        MessageRef {
            channel_id: self.channel_id.clone(),
            ts: self.ts.clone(),
        }
    }
}

// =============================================================================
// Inbound Interactions
// =============================================================================

/// Interaction payload posted to the request URL, routed by its `type`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Interaction {
    /// A button (or other block element) was clicked.
    BlockActions(BlockActionsPayload),
    /// Shortcuts, modals and anything else the relay does not handle.
    #[serde(other)]
    Unsupported,
}

/// Payload of a `block_actions` interaction.
#[derive(Debug, Clone, Deserialize)]
pub struct BlockActionsPayload {
    /// User who clicked.
    pub user: InteractionUser,
    /// Container the action came from.
    #[serde(default)]
    pub container: Option<InteractionContainer>,
    /// Channel the message lives in.
    #[serde(default)]
    pub channel: Option<InteractionChannel>,
    /// The message carrying the clicked element.
    #[serde(default)]
    pub message: Option<InteractionMessage>,
    /// Actions taken (usually one).
    #[serde(default)]
    pub actions: Vec<InteractionAction>,
}

impl BlockActionsPayload {
    /// The message the action was taken on.
    ///
    /// # Errors
    ///
    /// Returns `SlackError::InvalidPayload` if the channel or the message is
    /// missing. Without the original blocks the decided message cannot be
    /// rebuilt, so a bare `container.message_ts` is not enough.
    pub fn message_view(&self) -> Result<ChatMessageView, SlackError> {
        let channel_id = self
            .channel
            .as_ref()
            .map(|c| c.id.clone())
            .or_else(|| self.container.as_ref().and_then(|c| c.channel_id.clone()))
            .ok_or_else(|| SlackError::InvalidPayload("missing channel".to_string()))?;

        let message = self
            .message
            .as_ref()
            .ok_or_else(|| SlackError::InvalidPayload("missing message".to_string()))?;

        Ok(ChatMessageView {
            channel_id,
            ts: message.ts.clone(),
            blocks: message.blocks.clone(),
            text: message.text.clone(),
        })
    }
}

/// User who triggered an interaction.
#[derive(Debug, Clone, Deserialize)]
pub struct InteractionUser {
    /// User ID.
    pub id: String,
    /// Username.
    #[serde(default)]
    pub username: Option<String>,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
}

impl From<&InteractionUser> for ActorRef {
    fn from(user: &InteractionUser) -> Self {
        Self {
            user_id: user.id.clone(),
            username: user.username.clone(),
            name: user.name.clone(),
        }
    }
}

/// Container of an interaction.
#[derive(Debug, Clone, Deserialize)]
pub struct InteractionContainer {
    /// Message timestamp.
    #[serde(default)]
    pub message_ts: Option<String>,
    /// Channel ID.
    #[serde(default)]
    pub channel_id: Option<String>,
}

/// Channel of an interaction.
#[derive(Debug, Clone, Deserialize)]
pub struct InteractionChannel {
    /// Channel ID.
    pub id: String,
}

/// The message an interaction was taken on.
#[derive(Debug, Clone, Deserialize)]
pub struct InteractionMessage {
    /// Message timestamp.
    pub ts: String,
    /// Fallback text.
    #[serde(default)]
    pub text: Option<String>,
    /// Raw blocks.
    #[serde(default)]
    pub blocks: Vec<Value>,
}

/// A single action from an interaction.
#[derive(Debug, Clone, Deserialize)]
pub struct InteractionAction {
    /// Action ID of the clicked element.
    pub action_id: String,
    /// Block ID containing the element.
    #[serde(default)]
    pub block_id: Option<String>,
    /// Value attached to the element.
    #[serde(default)]
    pub value: Option<String>,
}

// =============================================================================
// Inbound Events
// =============================================================================

/// Events API envelope, routed by its `type`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventEnvelope {
    /// Handshake sent when the request URL is configured.
    UrlVerification { challenge: String },
    /// A subscribed event.
    EventCallback { event: SlackEvent },
    /// Rate-limit notices and anything else.
    #[serde(other)]
    Unsupported,
}

/// Subscribed event, routed by its `type`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SlackEvent {
    /// A user opened the app's Home tab.
    AppHomeOpened {
        user: String,
        #[serde(default)]
        tab: Option<String>,
    },
    /// Events the relay does not subscribe to.
    #[serde(other)]
    Unsupported,
}

// =============================================================================
// Web API Responses
// =============================================================================

/// Envelope shared by every Web API response.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse {
    /// Whether the call succeeded.
    pub ok: bool,
    /// Error code (if failed).
    #[serde(default)]
    pub error: Option<String>,
}

/// Response from `users.info`.
#[derive(Debug, Clone, Deserialize)]
pub struct UsersInfoResponse {
    /// Whether the call succeeded.
    pub ok: bool,
    /// Error code (if failed).
    #[serde(default)]
    pub error: Option<String>,
    /// The user.
    #[serde(default)]
    pub user: Option<SlackUser>,
}

/// User object from `users.info`.
#[derive(Debug, Clone, Deserialize)]
pub struct SlackUser {
    /// User ID.
    pub id: String,
    /// Profile fields.
    #[serde(default)]
    pub profile: Option<SlackUserProfile>,
}

/// Profile fields the relay reads.
#[derive(Debug, Clone, Deserialize)]
pub struct SlackUserProfile {
    /// Email address, present only with the `users:read.email` scope.
    #[serde(default)]
    pub email: Option<String>,
}
