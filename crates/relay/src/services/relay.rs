//! Decision relay.
//!
//! Orchestrates one Approve/Reject click:
//! 1. Decode the action id (nothing else happens if it is malformed)
//! 2. Claim the record so concurrent clicks cannot double-apply
//! 3. Resolve the reviewer's email
//! 4. Replace the buttons with a decision annotation
//! 5. Submit the decision to Salesforce
//! 6. Post an audit line in the message thread
//!
//! Steps 4 to 6 never undo each other. Each reports a [`StepOutcome`].

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use approval_relay_core::{
    ActionIdError, ActorDisplay, ActorRef, DecisionRequest, RecordId, ResolvedDecision,
};

use super::audit::{AuditEntry, AuditNotifier};
use super::ports::{ChatPlatform, CrmGateway};
use super::single_flight::{DecidedRecords, InFlightRecords};
use crate::salesforce::DecisionSubmission;
use crate::slack::{ChatMessageView, DEFAULT_FALLBACK_TEXT, reconcile};

/// Errors that stop a relay before any side effect.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The action id does not encode a decision.
    #[error("Malformed action id: {0}")]
    MalformedAction(#[from] ActionIdError),

    /// Another relay for the same record is running.
    #[error("A decision for record {0} is already in flight")]
    InFlight(RecordId),

    /// The record was decided within the dedupe window.
    #[error("Record {0} has already been decided")]
    AlreadyDecided(RecordId),
}

/// Result of one step that runs after the relay has started mutating state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// The step succeeded.
    Completed,
    /// The step failed; the reason was logged.
    Failed(String),
}

impl StepOutcome {
    /// Whether the step succeeded.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Outcome of a relay that got past decoding and the single-flight check.
#[derive(Debug, Clone)]
pub struct RelayResult {
    /// The decision taken.
    pub decision: ResolvedDecision,
    /// The Case decided on.
    pub record_id: RecordId,
    /// Who decided, as sent to Salesforce.
    pub actor_display: ActorDisplay,
    /// `chat.update` of the original message.
    pub chat: StepOutcome,
    /// Salesforce submission.
    pub crm: StepOutcome,
    /// Audit line in the thread.
    pub audit: StepOutcome,
}

/// Relays Approve/Reject clicks from Slack to Salesforce.
#[derive(Clone)]
pub struct DecisionRelay {
    chat: Arc<dyn ChatPlatform>,
    crm: Arc<dyn CrmGateway>,
    audit: AuditNotifier,
    in_flight: InFlightRecords,
    decided: DecidedRecords,
}

impl DecisionRelay {
    /// Create a relay. Records stay decided for `dedupe_ttl` after a
    /// successful submission.
    #[must_use]
    pub fn new(
        chat: Arc<dyn ChatPlatform>,
        crm: Arc<dyn CrmGateway>,
        dedupe_ttl: Duration,
    ) -> Self {
        Self {
            audit: AuditNotifier::new(Arc::clone(&chat)),
            chat,
            crm,
            in_flight: InFlightRecords::new(),
            decided: DecidedRecords::new(dedupe_ttl),
        }
    }

    /// Relay one click.
    ///
    /// # Errors
    ///
    /// Returns `RelayError` only when the click is refused before any side
    /// effect. Failures of later steps are reported in [`RelayResult`].
    #[instrument(
        skip(self, actor, message),
        fields(
            relay_id = %Uuid::new_v4(),
            action_id = %raw_action_id,
            user = %actor.user_id,
            channel = %message.channel_id,
            ts = %message.ts,
        )
    )]
    pub async fn relay(
        &self,
        raw_action_id: &str,
        actor: ActorRef,
        message: &ChatMessageView,
    ) -> Result<RelayResult, RelayError> {
        let request = DecisionRequest::decode(raw_action_id, actor).inspect_err(|e| {
            warn!(error = %e, "Ignoring malformed action id");
        })?;
        let record_id = request.record_id().clone();

        let Some(_claim) = self.in_flight.try_acquire(&record_id) else {
            warn!(record_id = %record_id, "Decision already in flight, ignoring click");
            return Err(RelayError::InFlight(record_id));
        };

        if self.decided.contains(&record_id).await {
            warn!(record_id = %record_id, "Record already decided, ignoring click");
            return Err(RelayError::AlreadyDecided(record_id));
        }

        let actor_display = self.resolve_actor(request.actor()).await;
        let decision = request.resolve();

        info!(
            record_id = %record_id,
            decision = %decision,
            actor = %actor_display,
            "Relaying decision"
        );

        let chat = self.update_message(message, decision).await;
        let crm = self.submit(&record_id, decision, &actor_display).await;

        let audit = self
            .audit
            .notify(
                &message.reference(),
                AuditEntry {
                    actor_user_id: &request.actor().user_id,
                    actor_display: &actor_display,
                    decision,
                    record_id: &record_id,
                    crm_failed: !crm.is_completed(),
                },
            )
            .await;

        info!(
            record_id = %record_id,
            chat_ok = chat.is_completed(),
            crm_ok = crm.is_completed(),
            audit_ok = audit.is_completed(),
            "Relay finished"
        );

        Ok(RelayResult {
            decision,
            record_id,
            actor_display,
            chat,
            crm,
            audit,
        })
    }

    /// Email from the user's profile, else a label derived from the user ID.
    async fn resolve_actor(&self, actor: &ActorRef) -> ActorDisplay {
        let email = match self.chat.user_email(&actor.user_id).await {
            Ok(email) => email,
            Err(e) => {
                warn!(error = %e, "User lookup failed, using fallback label");
                None
            }
        };
        ActorDisplay::resolve(actor, email.as_deref())
    }

    async fn update_message(
        &self,
        message: &ChatMessageView,
        decision: ResolvedDecision,
    ) -> StepOutcome {
        let blocks = reconcile(&message.blocks, decision);
        let text = message
            .text
            .as_deref()
            .filter(|text| !text.trim().is_empty())
            .unwrap_or(DEFAULT_FALLBACK_TEXT);

        match self
            .chat
            .update_message(&message.reference(), &blocks, text)
            .await
        {
            Ok(()) => StepOutcome::Completed,
            Err(e) => {
                error!(error = %e, "Failed to update Slack message, continuing");
                StepOutcome::Failed(e.to_string())
            }
        }
    }

    async fn submit(
        &self,
        record_id: &RecordId,
        decision: ResolvedDecision,
        actor_display: &ActorDisplay,
    ) -> StepOutcome {
        let submission = DecisionSubmission::new(record_id, decision.crm_status(), actor_display);

        match self.crm.submit_decision(&submission).await {
            Ok(()) => {
                self.decided.insert(record_id.clone()).await;
                StepOutcome::Completed
            }
            Err(e) => {
                // Display carries the full response body
                error!(record_id = %record_id, error = %e, "Failed to record decision in Salesforce");
                StepOutcome::Failed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::{Value, json};
    use tokio::sync::Notify;

    use approval_relay_core::{ActionKind, CrmDecisionStatus};

    use super::*;
    use crate::salesforce::SalesforceError;
    use crate::services::ports::{MockChatPlatform, MockCrmGateway};
    use crate::slack::{MessageRef, SlackError};

    const TTL: Duration = Duration::from_secs(900);

    fn message() -> ChatMessageView {
        ChatMessageView {
            channel_id: "C1".to_string(),
            ts: "1700000000.000100".to_string(),
            blocks: vec![
                json!({"type": "section", "text": {"type": "mrkdwn", "text": "*Case* 500ep0000024aVHAAY"}}),
                json!({"type": "actions", "elements": []}),
            ],
            text: Some("Approval Needed: High Priority Case".to_string()),
        }
    }

    fn has_no_actions(blocks: &[Value]) -> bool {
        !blocks.iter().any(|b| b["type"] == "actions")
    }

    #[tokio::test]
    async fn test_malformed_action_makes_no_calls() {
        let mut chat = MockChatPlatform::new();
        chat.expect_user_email().never();
        chat.expect_update_message().never();
        chat.expect_post_thread_message().never();
        let mut crm = MockCrmGateway::new();
        crm.expect_submit_decision().never();

        let relay = DecisionRelay::new(Arc::new(chat), Arc::new(crm), TTL);

        for raw in [
            "",
            "approve",
            "approve_action_",
            "escalate_action_500ep0000024aVHAAY",
            "approve_action_a_action_b",
            "approve_action_two words",
        ] {
            let result = relay.relay(raw, ActorRef::new("U1"), &message()).await;
            assert!(
                matches!(result, Err(RelayError::MalformedAction(_))),
                "{raw:?} should be malformed"
            );
        }
    }

    #[tokio::test]
    async fn test_approve_happy_path() {
        let mut chat = MockChatPlatform::new();
        chat.expect_user_email()
            .withf(|user_id| user_id == "U1")
            .times(1)
            .returning(|_| Ok(Some("a@x.com".to_string())));
        chat.expect_update_message()
            .withf(|message, blocks, text| {
                message.ts == "1700000000.000100"
                    && has_no_actions(blocks)
                    && blocks.last().unwrap()["text"]["text"] == "*This case has been Approved ✅*"
                    && text == "Approval Needed: High Priority Case"
            })
            .times(1)
            .returning(|_, _, _| Ok(()));
        chat.expect_post_thread_message()
            .withf(|_, text| text.contains("has Approved ✅ Case 500ep0000024aVHAAY"))
            .times(1)
            .returning(|_, _| Ok(()));

        let mut crm = MockCrmGateway::new();
        crm.expect_submit_decision()
            .withf(|submission| {
                submission.record_id == "500ep0000024aVHAAY"
                    && submission.decision == CrmDecisionStatus::Approved
                    && submission.user_email == "a@x.com"
            })
            .times(1)
            .returning(|_| Ok(()));

        let relay = DecisionRelay::new(Arc::new(chat), Arc::new(crm), TTL);
        let result = relay
            .relay(
                "approve_action_500ep0000024aVHAAY",
                ActorRef::new("U1"),
                &message(),
            )
            .await
            .unwrap();

        assert_eq!(result.decision.kind(), ActionKind::Approve);
        assert_eq!(result.record_id.as_str(), "500ep0000024aVHAAY");
        assert_eq!(result.chat, StepOutcome::Completed);
        assert_eq!(result.crm, StepOutcome::Completed);
        assert_eq!(result.audit, StepOutcome::Completed);
    }

    #[tokio::test]
    async fn test_lookup_failure_uses_fallback_label() {
        let mut chat = MockChatPlatform::new();
        chat.expect_user_email()
            .returning(|_| Err(SlackError::Api("missing_scope".to_string())));
        chat.expect_update_message().returning(|_, _, _| Ok(()));
        chat.expect_post_thread_message().returning(|_, _| Ok(()));

        let mut crm = MockCrmGateway::new();
        crm.expect_submit_decision()
            .withf(|submission| {
                submission.record_id == "caseWith_underscore_1"
                    && submission.decision == CrmDecisionStatus::Rejected
                    && submission.user_email == "SlackUser-U7"
            })
            .times(1)
            .returning(|_| Ok(()));

        let relay = DecisionRelay::new(Arc::new(chat), Arc::new(crm), TTL);
        let result = relay
            .relay(
                "reject_action_caseWith_underscore_1",
                ActorRef::new("U7"),
                &message(),
            )
            .await
            .unwrap();

        assert_eq!(result.actor_display.as_str(), "SlackUser-U7");
    }

    #[tokio::test]
    async fn test_chat_failure_still_reaches_crm() {
        let mut chat = MockChatPlatform::new();
        chat.expect_user_email().returning(|_| Ok(None));
        chat.expect_update_message()
            .times(1)
            .returning(|_, _, _| Err(SlackError::Api("message_not_found".to_string())));
        chat.expect_post_thread_message().returning(|_, _| Ok(()));

        let mut crm = MockCrmGateway::new();
        crm.expect_submit_decision().times(1).returning(|_| Ok(()));

        let relay = DecisionRelay::new(Arc::new(chat), Arc::new(crm), TTL);
        let result = relay
            .relay("approve_action_500A", ActorRef::new("U1"), &message())
            .await
            .unwrap();

        assert!(matches!(result.chat, StepOutcome::Failed(_)));
        assert_eq!(result.crm, StepOutcome::Completed);
    }

    #[tokio::test]
    async fn test_crm_failure_keeps_chat_and_notes_in_audit() {
        let mut chat = MockChatPlatform::new();
        chat.expect_user_email().returning(|_| Ok(None));
        chat.expect_update_message().times(2).returning(|_, _, _| Ok(()));
        chat.expect_post_thread_message()
            .withf(|_, text| text.contains("not recorded in Salesforce"))
            .times(2)
            .returning(|_, _| Ok(()));

        let mut crm = MockCrmGateway::new();
        crm.expect_submit_decision().times(2).returning(|_| {
            Err(SalesforceError::UpdateRejected {
                status: 500,
                body: "APEX_ERROR".to_string(),
            })
        });

        let relay = DecisionRelay::new(Arc::new(chat), Arc::new(crm), TTL);
        let result = relay
            .relay("approve_action_500A", ActorRef::new("U1"), &message())
            .await
            .unwrap();

        assert_eq!(result.chat, StepOutcome::Completed);
        assert!(matches!(result.crm, StepOutcome::Failed(ref reason) if reason.contains("APEX_ERROR")));
        assert_eq!(result.audit, StepOutcome::Completed);

        // A failed submission does not mark the record decided
        let again = relay
            .relay("approve_action_500A", ActorRef::new("U1"), &message())
            .await
            .unwrap();
        assert!(matches!(again.crm, StepOutcome::Failed(_)));
    }

    /// Chat fake whose user lookup parks until released.
    #[derive(Default)]
    struct ParkedChat {
        entered: Notify,
        release: Notify,
        updates: Mutex<Vec<MessageRef>>,
    }

    #[async_trait]
    impl ChatPlatform for ParkedChat {
        async fn user_email(&self, _user_id: &str) -> Result<Option<String>, SlackError> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok(Some("a@x.com".to_string()))
        }

        async fn update_message(
            &self,
            message: &MessageRef,
            _blocks: &[Value],
            _text: &str,
        ) -> Result<(), SlackError> {
            self.updates.lock().unwrap().push(message.clone());
            Ok(())
        }

        async fn post_thread_message(
            &self,
            _thread: &MessageRef,
            _text: &str,
        ) -> Result<(), SlackError> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct CountingCrm {
        submissions: AtomicUsize,
    }

    #[async_trait]
    impl CrmGateway for CountingCrm {
        async fn submit_decision(
            &self,
            _submission: &DecisionSubmission,
        ) -> Result<(), SalesforceError> {
            self.submissions.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_concurrent_clicks_apply_once() {
        let chat = Arc::new(ParkedChat::default());
        let crm = Arc::new(CountingCrm::default());
        let relay = Arc::new(DecisionRelay::new(chat.clone(), crm.clone(), TTL));

        let first = tokio::spawn({
            let relay = Arc::clone(&relay);
            async move {
                relay
                    .relay("approve_action_500A", ActorRef::new("U1"), &message())
                    .await
            }
        });

        // First relay holds the record while parked in the user lookup
        chat.entered.notified().await;

        let second = relay
            .relay("reject_action_500A", ActorRef::new("U2"), &message())
            .await;
        assert!(matches!(second, Err(RelayError::InFlight(ref id)) if id.as_str() == "500A"));

        chat.release.notify_one();
        let first = first.await.unwrap().unwrap();
        assert_eq!(first.crm, StepOutcome::Completed);

        let late = relay
            .relay("reject_action_500A", ActorRef::new("U2"), &message())
            .await;
        assert!(matches!(late, Err(RelayError::AlreadyDecided(_))));

        assert_eq!(crm.submissions.load(Ordering::SeqCst), 1);
        assert_eq!(chat.updates.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_different_records_do_not_block_each_other() {
        let chat = Arc::new(ParkedChat::default());
        let crm = Arc::new(CountingCrm::default());
        let relay = Arc::new(DecisionRelay::new(chat.clone(), crm.clone(), TTL));

        let first = tokio::spawn({
            let relay = Arc::clone(&relay);
            async move {
                relay
                    .relay("approve_action_500A", ActorRef::new("U1"), &message())
                    .await
            }
        });
        chat.entered.notified().await;

        let second = tokio::spawn({
            let relay = Arc::clone(&relay);
            async move {
                relay
                    .relay("approve_action_500B", ActorRef::new("U1"), &message())
                    .await
            }
        });
        chat.entered.notified().await;

        chat.release.notify_waiters();
        assert!(first.await.unwrap().is_ok());
        assert!(second.await.unwrap().is_ok());
        assert_eq!(crm.submissions.load(Ordering::SeqCst), 2);
    }
}
