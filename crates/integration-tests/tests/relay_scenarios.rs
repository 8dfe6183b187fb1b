//! End-to-end decision scenarios.
//!
//! Each test drives the relay built from configuration against mocked Slack
//! and Salesforce servers and checks both the outbound calls and the
//! per-step outcome.

#![allow(clippy::unwrap_used)]

use serde_json::json;

use approval_relay::services::{RelayError, StepOutcome};
use approval_relay_core::{ActionKind, ActorRef};
use approval_relay_integration_tests::{Harness, RETRY_ATTEMPTS, approval_message};

const CASE_ID: &str = "500ep0000024aVHAAY";

// =============================================================================
// Scenario A: approve with a known email
// =============================================================================

#[tokio::test]
async fn test_approve_records_decision_everywhere() {
    let h = Harness::start().await;

    let users = h.mock_users_info("U1", Some("a@x.com")).await;
    let update = h.mock_chat_update("This case has been Approved ✅").await;
    let token = h.mock_token("00Dfresh").await;
    let decision = h
        .mock_decision(
            json!({"recordId": CASE_ID, "decision": "Approved", "userEmail": "a@x.com"}),
            200,
        )
        .await;
    let audit = h
        .mock_thread_reply(&format!("<@U1> (a@x.com) has Approved ✅ Case {CASE_ID}."))
        .await;

    let result = h
        .state
        .relay()
        .relay(
            &format!("approve_action_{CASE_ID}"),
            ActorRef::new("U1"),
            &approval_message(CASE_ID),
        )
        .await
        .unwrap();

    assert_eq!(result.decision.kind(), ActionKind::Approve);
    assert_eq!(result.record_id.as_str(), CASE_ID);
    assert_eq!(result.actor_display.as_str(), "a@x.com");
    assert_eq!(result.chat, StepOutcome::Completed);
    assert_eq!(result.crm, StepOutcome::Completed);
    assert_eq!(result.audit, StepOutcome::Completed);

    users.assert_async().await;
    update.assert_async().await;
    token.assert_async().await;
    decision.assert_async().await;
    audit.assert_async().await;
}

#[tokio::test]
async fn test_decided_message_keeps_content_and_drops_buttons() {
    let h = Harness::start().await;

    h.mock_users_info("U1", Some("a@x.com")).await;
    let keeps_details = h.mock_chat_update("\"block_id\":\"details\"").await;
    h.mock_token("00Dfresh").await;
    h.mock_any_decision(200).await;
    h.mock_thread_reply("has Approved").await;

    h.state
        .relay()
        .relay(
            &format!("approve_action_{CASE_ID}"),
            ActorRef::new("U1"),
            &approval_message(CASE_ID),
        )
        .await
        .unwrap();

    keeps_details.assert_async().await;
}

// =============================================================================
// Scenario B: reject, record id with underscores, no email on profile
// =============================================================================

#[tokio::test]
async fn test_reject_splits_on_first_marker_and_falls_back_to_user_id() {
    let h = Harness::start().await;

    h.mock_users_info("U2", None).await;
    let update = h.mock_chat_update("This case has been Rejected ❌").await;
    h.mock_token("00Dfresh").await;
    let decision = h
        .mock_decision(
            json!({
                "recordId": "caseWith_underscore_1",
                "decision": "Rejected",
                "userEmail": "SlackUser-U2"
            }),
            200,
        )
        .await;
    let audit = h
        .mock_thread_reply("<@U2> (SlackUser-U2) has Rejected ❌ Case caseWith_underscore_1.")
        .await;

    let result = h
        .state
        .relay()
        .relay(
            "reject_action_caseWith_underscore_1",
            ActorRef::new("U2"),
            &approval_message("caseWith_underscore_1"),
        )
        .await
        .unwrap();

    assert_eq!(result.record_id.as_str(), "caseWith_underscore_1");
    assert_eq!(result.decision.kind(), ActionKind::Reject);
    assert!(!result.actor_display.is_email());

    update.assert_async().await;
    decision.assert_async().await;
    audit.assert_async().await;
}

// =============================================================================
// Scenario C: Salesforce rejects the update
// =============================================================================

#[tokio::test]
async fn test_crm_server_error_keeps_chat_update_and_notes_failure() {
    let h = Harness::start().await;

    h.mock_users_info("U1", Some("a@x.com")).await;
    let update = h.mock_chat_update("This case has been Approved").await;
    h.mock_token("00Dfresh").await;
    let decision = h
        .mock_decision(
            json!({"recordId": CASE_ID, "decision": "Approved", "userEmail": "a@x.com"}),
            500,
        )
        .await;
    let audit = h
        .mock_thread_reply("The decision was not recorded in Salesforce")
        .await;

    let result = h
        .state
        .relay()
        .relay(
            &format!("approve_action_{CASE_ID}"),
            ActorRef::new("U1"),
            &approval_message(CASE_ID),
        )
        .await
        .unwrap();

    assert_eq!(result.chat, StepOutcome::Completed);
    assert!(
        matches!(result.crm, StepOutcome::Failed(ref reason) if reason.contains("HTTP 500") && reason.contains("APEX_ERROR"))
    );
    assert_eq!(result.audit, StepOutcome::Completed);

    update.assert_async().await;
    decision.assert_calls_async(RETRY_ATTEMPTS as usize).await;
    audit.assert_async().await;
}

#[tokio::test]
async fn test_crm_client_error_is_not_retried() {
    let h = Harness::start().await;

    h.mock_users_info("U1", Some("a@x.com")).await;
    h.mock_chat_update("This case has been Rejected").await;
    h.mock_token("00Dfresh").await;
    let decision = h.mock_any_decision(400).await;
    h.mock_thread_reply("not recorded in Salesforce").await;

    let result = h
        .state
        .relay()
        .relay(
            &format!("reject_action_{CASE_ID}"),
            ActorRef::new("U1"),
            &approval_message(CASE_ID),
        )
        .await
        .unwrap();

    assert!(matches!(result.crm, StepOutcome::Failed(_)));
    decision.assert_calls_async(1).await;
}

// =============================================================================
// Scenario D: the token endpoint refuses
// =============================================================================

#[tokio::test]
async fn test_token_failure_skips_update_and_notes_failure() {
    let h = Harness::start().await;

    h.mock_users_info("U1", Some("a@x.com")).await;
    let update = h.mock_chat_update("This case has been Approved").await;
    let token = h.mock_token_failure(401).await;
    let decision = h.mock_any_decision(200).await;
    let audit = h
        .mock_thread_reply("The decision was not recorded in Salesforce")
        .await;

    let result = h
        .state
        .relay()
        .relay(
            &format!("approve_action_{CASE_ID}"),
            ActorRef::new("U1"),
            &approval_message(CASE_ID),
        )
        .await
        .unwrap();

    assert_eq!(result.chat, StepOutcome::Completed);
    assert!(
        matches!(result.crm, StepOutcome::Failed(ref reason) if reason.contains("Authentication failed"))
    );
    assert_eq!(result.audit, StepOutcome::Completed);

    update.assert_async().await;
    token.assert_calls_async(1).await;
    decision.assert_calls_async(0).await;
    audit.assert_async().await;
}

// =============================================================================
// Dedupe and partial failures
// =============================================================================

#[tokio::test]
async fn test_second_click_after_success_is_refused() {
    let h = Harness::start().await;

    h.mock_users_info("U1", Some("a@x.com")).await;
    let update = h.mock_chat_update("This case has been Approved").await;
    h.mock_token("00Dfresh").await;
    let decision = h.mock_any_decision(200).await;
    h.mock_thread_reply("has Approved").await;

    let relay = h.state.relay();
    let message = approval_message(CASE_ID);
    let action_id = format!("approve_action_{CASE_ID}");

    relay
        .relay(&action_id, ActorRef::new("U1"), &message)
        .await
        .unwrap();

    let again = relay
        .relay(&format!("reject_action_{CASE_ID}"), ActorRef::new("U1"), &message)
        .await;
    assert!(matches!(again, Err(RelayError::AlreadyDecided(ref id)) if id.as_str() == CASE_ID));

    update.assert_calls_async(1).await;
    decision.assert_calls_async(1).await;
}

#[tokio::test]
async fn test_slack_update_failure_still_reaches_crm() {
    let h = Harness::start().await;

    h.mock_users_info("U1", Some("a@x.com")).await;
    let update = h
        .slack
        .mock_async(|when, then| {
            when.method(httpmock::Method::POST).path("/chat.update");
            then.status(200)
                .json_body(json!({"ok": false, "error": "message_not_found"}));
        })
        .await;
    h.mock_token("00Dfresh").await;
    let decision = h.mock_any_decision(200).await;
    h.mock_thread_reply("has Approved").await;

    let result = h
        .state
        .relay()
        .relay(
            &format!("approve_action_{CASE_ID}"),
            ActorRef::new("U1"),
            &approval_message(CASE_ID),
        )
        .await
        .unwrap();

    assert!(
        matches!(result.chat, StepOutcome::Failed(ref reason) if reason.contains("message_not_found"))
    );
    assert_eq!(result.crm, StepOutcome::Completed);

    // ok=false is a permanent API error
    update.assert_calls_async(1).await;
    decision.assert_async().await;
}

#[tokio::test]
async fn test_malformed_action_makes_no_outbound_calls() {
    let h = Harness::start().await;

    let slack_any = h
        .slack
        .mock_async(|when, then| {
            when.any_request();
            then.status(200).json_body(json!({"ok": true}));
        })
        .await;
    let salesforce_any = h
        .salesforce
        .mock_async(|when, then| {
            when.any_request();
            then.status(200);
        })
        .await;

    let result = h
        .state
        .relay()
        .relay(
            "escalate_action_500A",
            ActorRef::new("U1"),
            &approval_message("500A"),
        )
        .await;

    assert!(matches!(result, Err(RelayError::MalformedAction(_))));
    slack_any.assert_calls_async(0).await;
    salesforce_any.assert_calls_async(0).await;
}
