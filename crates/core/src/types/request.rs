//! Decision requests decoded from interactive actions.

use serde::Serialize;

use super::action::{ActionIdError, ActionKind, RecordId, split_action_id};
use super::actor::ActorRef;
use super::decision::ResolvedDecision;

/// A reviewer's click, decoded and validated.
///
/// Built only through [`DecisionRequest::decode`]; immutable afterwards.
///
/// ```
/// use approval_relay_core::{ActionKind, ActorRef, DecisionRequest};
///
/// let request = DecisionRequest::decode(
///     "reject_action_caseWith_underscore_1",
///     ActorRef::new("U123"),
/// )
/// .unwrap();
///
/// assert_eq!(request.kind(), ActionKind::Reject);
/// assert_eq!(request.record_id().as_str(), "caseWith_underscore_1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecisionRequest {
    actor: ActorRef,
    kind: ActionKind,
    record_id: RecordId,
}

impl DecisionRequest {
    /// Decode a raw action identifier of the form `<kind>_action_<record id>`.
    ///
    /// # Errors
    ///
    /// Returns an [`ActionIdError`] if the identifier is malformed.
    pub fn decode(raw_action_id: &str, actor: ActorRef) -> Result<Self, ActionIdError> {
        let (kind, record_id) = split_action_id(raw_action_id)?;
        Ok(Self {
            actor,
            kind,
            record_id,
        })
    }

    /// Who clicked.
    #[must_use]
    pub const fn actor(&self) -> &ActorRef {
        &self.actor
    }

    /// Which button was clicked.
    #[must_use]
    pub const fn kind(&self) -> ActionKind {
        self.kind
    }

    /// The CRM record the decision targets.
    #[must_use]
    pub const fn record_id(&self) -> &RecordId {
        &self.record_id
    }

    /// Resolve the decision via the fixed mapping table.
    #[must_use]
    pub const fn resolve(&self) -> ResolvedDecision {
        ResolvedDecision::from_kind(self.kind)
    }
}
