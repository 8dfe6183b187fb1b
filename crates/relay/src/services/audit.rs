//! Audit trace posted into the approval request's thread.

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use approval_relay_core::{ActorDisplay, RecordId, ResolvedDecision};

use super::ports::ChatPlatform;
use super::relay::StepOutcome;
use crate::slack::{MessageRef, build_audit_text};

/// What happened, for the audit line.
#[derive(Debug, Clone, Copy)]
pub struct AuditEntry<'a> {
    /// Slack user ID of the reviewer.
    pub actor_user_id: &'a str,
    /// Email or fallback label of the reviewer.
    pub actor_display: &'a ActorDisplay,
    /// The decision taken.
    pub decision: ResolvedDecision,
    /// The Case decided on.
    pub record_id: &'a RecordId,
    /// Whether the CRM step failed.
    pub crm_failed: bool,
}

/// Posts best-effort audit lines. Failures are logged, never returned.
#[derive(Clone)]
pub struct AuditNotifier {
    chat: Arc<dyn ChatPlatform>,
}

impl AuditNotifier {
    /// Create a notifier posting through `chat`.
    #[must_use]
    pub fn new(chat: Arc<dyn ChatPlatform>) -> Self {
        Self { chat }
    }

    /// Post `entry` into the thread of `thread`.
    #[instrument(skip(self, entry), fields(record_id = %entry.record_id))]
    pub async fn notify(&self, thread: &MessageRef, entry: AuditEntry<'_>) -> StepOutcome {
        let text = build_audit_text(
            entry.actor_user_id,
            entry.actor_display,
            entry.decision,
            entry.record_id,
            entry.crm_failed,
        );

        match self.chat.post_thread_message(thread, &text).await {
            Ok(()) => {
                debug!("Audit trace posted");
                StepOutcome::Completed
            }
            Err(e) => {
                warn!(error = %e, "Failed to post audit trace");
                StepOutcome::Failed(e.to_string())
            }
        }
    }
}
