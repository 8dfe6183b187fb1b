//! Slack webhook handlers.
//!
//! Both endpoints verify the request signature before reading the body.
//! Work that calls Slack or Salesforce runs on a background task after the
//! request has been acknowledged, since Slack expects an answer within
//! three seconds.

use std::path::Path;

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use serde_json::{Value, json};
use tracing::{debug, info, instrument, warn};

use approval_relay_core::ActorRef;

use crate::error::AppError;
use crate::slack::{EventEnvelope, Interaction, SlackEvent};
use crate::state::AppState;

/// Create Slack webhook routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/slack/interactions", post(handle_interaction))
        .route("/slack/events", post(handle_event))
}

/// Check the signing headers of a webhook request.
fn verify_request(state: &AppState, headers: &HeaderMap, body: &str) -> Result<(), AppError> {
    let timestamp = headers
        .get("X-Slack-Request-Timestamp")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("Missing timestamp header".into()))?;

    let signature = headers
        .get("X-Slack-Signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("Missing signature header".into()))?;

    state
        .slack()
        .verify_signature(timestamp, body, signature)
        .map_err(|e| AppError::Unauthorized(e.to_string()))?;

    debug!("Slack signature verified");
    Ok(())
}

/// Extract the JSON document from a `payload=<urlencoded json>` form body.
fn decode_form_payload(body: &str) -> Result<String, AppError> {
    let encoded = body
        .strip_prefix("payload=")
        .ok_or_else(|| AppError::BadRequest("Invalid payload format".into()))?;

    // Form encoding writes spaces as '+'
    let encoded = encoded.replace('+', "%20");

    urlencoding::decode(&encoded)
        .map(std::borrow::Cow::into_owned)
        .map_err(|e| AppError::BadRequest(format!("Failed to decode payload: {e}")))
}

/// Handle an interactive component webhook.
///
/// Every action in a `block_actions` payload is handed to the decision
/// relay. Other interaction types are acknowledged and ignored.
#[instrument(skip(state, headers, body))]
async fn handle_interaction(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<impl IntoResponse, AppError> {
    verify_request(&state, &headers, &body)?;

    let payload = decode_form_payload(&body)?;
    let interaction: Interaction = serde_json::from_str(&payload)
        .map_err(|e| AppError::BadRequest(format!("Failed to parse payload: {e}")))?;

    let Interaction::BlockActions(payload) = interaction else {
        debug!("Ignoring unsupported interaction type");
        return Ok(StatusCode::OK);
    };

    let message = payload
        .message_view()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    let actor = ActorRef::from(&payload.user);

    for action in payload.actions {
        info!(
            action_id = %action.action_id,
            user = %actor.user_id,
            channel = %message.channel_id,
            "Dispatching click"
        );

        let task_state = state.clone();
        let actor = actor.clone();
        let message = message.clone();
        state.spawn(async move {
            if let Err(e) = task_state
                .relay()
                .relay(&action.action_id, actor, &message)
                .await
            {
                debug!(error = %e, "Click not relayed");
            }
        });
    }

    // Acknowledge before the relay runs; its outcome is reported in the thread
    Ok(StatusCode::OK)
}

/// Handle an Events API webhook.
#[instrument(skip(state, headers, body))]
async fn handle_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<Response, AppError> {
    verify_request(&state, &headers, &body)?;

    let envelope: EventEnvelope = serde_json::from_str(&body)
        .map_err(|e| AppError::BadRequest(format!("Failed to parse event: {e}")))?;

    match envelope {
        EventEnvelope::UrlVerification { challenge } => {
            info!("Answering URL verification");
            Ok(Json(json!({ "challenge": challenge })).into_response())
        }
        EventEnvelope::EventCallback {
            event: SlackEvent::AppHomeOpened { user, tab },
        } if tab.as_deref().is_none_or(|tab| tab == "home") => {
            let task_state = state.clone();
            state.spawn(async move {
                publish_home(&task_state, &user).await;
            });
            Ok(StatusCode::OK.into_response())
        }
        EventEnvelope::EventCallback { .. } | EventEnvelope::Unsupported => {
            debug!("Ignoring unsupported event");
            Ok(StatusCode::OK.into_response())
        }
    }
}

/// Read the App Home view from disk.
async fn load_home_view(path: &Path) -> Result<Value, AppError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to read {}: {e}", path.display())))?;

    serde_json::from_str(&raw)
        .map_err(|e| AppError::Internal(format!("Invalid home view {}: {e}", path.display())))
}

#[instrument(skip(state))]
async fn publish_home(state: &AppState, user_id: &str) {
    let view = match load_home_view(state.home_view_path()).await {
        Ok(view) => view,
        Err(e) => {
            warn!(error = %e, "App Home view unavailable");
            return;
        }
    };

    if let Err(e) = state.slack().publish_home_view(user_id, &view).await {
        warn!(error = %e, "Failed to publish App Home view");
    }
}
