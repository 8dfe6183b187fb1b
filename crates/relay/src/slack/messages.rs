//! Message builders for the approval flow.
//!
//! Provides:
//! - [`reconcile`] to turn an approval request into its decided form
//! - The audit line posted into the request's thread

use serde_json::Value;

use approval_relay_core::{ActorDisplay, RecordId, ResolvedDecision};

use super::types::{Block, Text};

/// `block_id` of the annotation appended by [`reconcile`].
pub const DECISION_BLOCK_ID: &str = "relay_decision";

/// Fallback text used when the original message carried none.
pub const DEFAULT_FALLBACK_TEXT: &str = "Approval Needed: High Priority Case";

/// Build the annotation block recording a decision.
#[must_use]
pub fn build_decision_block(decision: ResolvedDecision) -> Block {
    Block::Section {
        text: Text::mrkdwn(format!(
            "*This case has been {} {}*",
            decision.label(),
            decision.emoji()
        )),
        block_id: Some(DECISION_BLOCK_ID.to_string()),
    }
}

/// Strip interactive controls and any earlier decision annotation, then
/// append one annotation for `decision`.
///
/// Every other block is kept as-is and in order, so applying this twice
/// yields the same blocks as applying it once.
#[must_use]
pub fn reconcile(blocks: &[Value], decision: ResolvedDecision) -> Vec<Value> {
    let mut reconciled: Vec<Value> = blocks
        .iter()
        .filter(|block| !is_actions_block(block) && !is_decision_block(block))
        .cloned()
        .collect();

    reconciled.push(build_decision_block(decision).into_value());
    reconciled
}

fn is_actions_block(block: &Value) -> bool {
    block.get("type").and_then(Value::as_str) == Some("actions")
}

fn is_decision_block(block: &Value) -> bool {
    block.get("block_id").and_then(Value::as_str) == Some(DECISION_BLOCK_ID)
}

/// Build the audit line posted into the request's thread.
///
/// `crm_failed` is set when the decision did not reach Salesforce.
#[must_use]
pub fn build_audit_text(
    actor_user_id: &str,
    actor_display: &ActorDisplay,
    decision: ResolvedDecision,
    record_id: &RecordId,
    crm_failed: bool,
) -> String {
    let mut text = format!(
        "_<@{actor_user_id}> ({actor_display}) has {} {} Case {record_id}._",
        decision.label(),
        decision.emoji()
    );

    if crm_failed {
        text.push_str(
            "\n:warning: _The decision was not recorded in Salesforce. \
             An operator needs to apply it manually._",
        );
    }

    text
}
