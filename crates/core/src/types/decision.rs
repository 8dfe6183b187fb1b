//! Resolved decisions and their CRM status values.

use core::fmt;

use serde::{Deserialize, Serialize};

use super::action::ActionKind;

/// Decision status values accepted by the CRM approval endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CrmDecisionStatus {
    Approved,
    Rejected,
}

impl CrmDecisionStatus {
    /// Returns the exact string the CRM expects in the `decision` field.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
        }
    }
}

impl fmt::Display for CrmDecisionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decision resolved from an [`ActionKind`].
///
/// The only way to build one is [`ResolvedDecision::from_kind`], which applies
/// the fixed table:
///
/// | Action kind | Label | CRM status |
/// |---|---|---|
/// | `Approve` | `Approved` | `Approved` |
/// | `Reject` | `Rejected` | `Rejected` |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ResolvedDecision {
    kind: ActionKind,
    label: &'static str,
    crm_status: CrmDecisionStatus,
}

impl ResolvedDecision {
    /// Resolve the decision for an action kind.
    #[must_use]
    pub const fn from_kind(kind: ActionKind) -> Self {
        match kind {
            ActionKind::Approve => Self {
                kind,
                label: "Approved",
                crm_status: CrmDecisionStatus::Approved,
            },
            ActionKind::Reject => Self {
                kind,
                label: "Rejected",
                crm_status: CrmDecisionStatus::Rejected,
            },
        }
    }

    /// The action kind this decision was resolved from.
    #[must_use]
    pub const fn kind(&self) -> ActionKind {
        self.kind
    }

    /// Human-readable label ("Approved" / "Rejected").
    #[must_use]
    pub const fn label(&self) -> &'static str {
        self.label
    }

    /// Value sent to the CRM.
    #[must_use]
    pub const fn crm_status(&self) -> CrmDecisionStatus {
        self.crm_status
    }

    /// Emoji rendered next to the label in chat messages.
    #[must_use]
    pub const fn emoji(&self) -> &'static str {
        match self.kind {
            ActionKind::Approve => "✅",
            ActionKind::Reject => "❌",
        }
    }
}

impl From<ActionKind> for ResolvedDecision {
    fn from(kind: ActionKind) -> Self {
        Self::from_kind(kind)
    }
}

impl fmt::Display for ResolvedDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_mapping_table_is_fixed() {
        let approved = ResolvedDecision::from_kind(ActionKind::Approve);
        assert_eq!(approved.label(), "Approved");
        assert_eq!(approved.crm_status(), CrmDecisionStatus::Approved);

        let rejected = ResolvedDecision::from_kind(ActionKind::Reject);
        assert_eq!(rejected.label(), "Rejected");
        assert_eq!(rejected.crm_status(), CrmDecisionStatus::Rejected);
    }

    #[test]
    fn test_mapping_holds_for_any_casing() {
        for raw in ["approve", "APPROVE", "Approve"] {
            let kind: ActionKind = raw.parse().unwrap();
            assert_eq!(ResolvedDecision::from(kind).crm_status().as_str(), "Approved");
        }
        for raw in ["reject", "REJECT", "Reject"] {
            let kind: ActionKind = raw.parse().unwrap();
            assert_eq!(ResolvedDecision::from(kind).crm_status().as_str(), "Rejected");
        }
    }

    #[test]
    fn test_crm_status_serializes_as_crm_expects() {
        assert_eq!(
            serde_json::to_string(&CrmDecisionStatus::Approved).unwrap(),
            "\"Approved\""
        );
        assert_eq!(
            serde_json::to_string(&CrmDecisionStatus::Rejected).unwrap(),
            "\"Rejected\""
        );
    }
}
