//! Slack integration for case approval requests.
//!
//! This module provides:
//! - [`SlackClient`] for updating messages, posting audit replies, looking
//!   up reviewer emails and publishing the App Home
//! - Block Kit types for the decision annotation
//! - Inbound payload types for interactions and events
//! - Webhook signature verification
//!
//! # Flow
//!
//! 1. An upstream system posts the approval request with Approve/Reject buttons
//! 2. A reviewer clicks a button
//! 3. The webhook handler verifies the signature and decodes the interaction
//! 4. The relay replaces the buttons with the decision and informs Salesforce
//! 5. An audit line is posted in the message thread

mod client;
mod error;
mod messages;
mod types;

pub use client::SlackClient;
pub use error::SlackError;
pub use messages::{
    DECISION_BLOCK_ID, DEFAULT_FALLBACK_TEXT, build_audit_text, build_decision_block, reconcile,
};
pub use types::{
    ApiResponse, Block, BlockActionsPayload, ChatMessageView, EventEnvelope, Interaction,
    InteractionAction, InteractionChannel, InteractionContainer, InteractionMessage,
    InteractionUser, MessageRef, SlackEvent, SlackUser, SlackUserProfile, Text,
    UsersInfoResponse,
};
