//! Interactive action identifiers.
//!
//! Approval buttons carry an action id of the form `<kind>_action_<record id>`,
//! for example `approve_action_500ep0000024aVHAAY`. The identifier is split on
//! the *first* occurrence of [`ACTION_SEPARATOR`], so record ids that contain
//! underscores survive intact.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Literal separating the action kind from the record id.
pub const ACTION_SEPARATOR: &str = "_action_";

/// Errors that can occur when decoding an action identifier.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ActionIdError {
    /// The identifier does not contain the `_action_` separator.
    #[error("action id is missing the `_action_` separator")]
    MissingSeparator,
    /// The part before the separator is not `approve` or `reject`.
    #[error("unknown action kind `{0}`")]
    UnknownKind(String),
    /// The record id is empty.
    #[error("record id cannot be empty")]
    EmptyRecordId,
    /// The record id contains a second separator.
    #[error("record id cannot contain `_action_`")]
    NestedSeparator,
    /// The record id contains whitespace or control characters.
    #[error("record id contains invalid character {0:?}")]
    InvalidCharacter(char),
}

/// The decision a reviewer clicked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// The "Approve" button.
    Approve,
    /// The "Reject" button.
    Reject,
}

impl ActionKind {
    /// Returns the canonical lowercase token used in action ids.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
        }
    }

    /// Builds the action id for a button targeting `record_id`.
    #[must_use]
    pub fn action_id(self, record_id: &RecordId) -> String {
        format!("{}{ACTION_SEPARATOR}{}", self.as_str(), record_id.as_str())
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ActionKind {
    type Err = ActionIdError;

    /// Kind tokens are matched ASCII case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("approve") {
            Ok(Self::Approve)
        } else if s.eq_ignore_ascii_case("reject") {
            Ok(Self::Reject)
        } else {
            Err(ActionIdError::UnknownKind(s.to_owned()))
        }
    }
}

/// Identifier of the CRM record (a Salesforce Case id) a decision applies to.
///
/// ## Constraints
///
/// - Leading and trailing whitespace is trimmed
/// - Must not be empty after trimming
/// - Must not contain [`ACTION_SEPARATOR`]
/// - Must not contain inner whitespace or control characters
///
/// Underscores are allowed anywhere.
///
/// ## Examples
///
/// ```
/// use approval_relay_core::RecordId;
///
/// assert!(RecordId::parse("500ep0000024aVHAAY").is_ok());
/// assert!(RecordId::parse("caseWith_underscore_1").is_ok());
///
/// assert!(RecordId::parse("   ").is_err());
/// assert!(RecordId::parse("a_action_b").is_err());
/// assert!(RecordId::parse("two words").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Parse a `RecordId` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the trimmed input is empty, contains the action
    /// separator, or contains whitespace/control characters.
    pub fn parse(s: &str) -> Result<Self, ActionIdError> {
        let trimmed = s.trim();

        if trimmed.is_empty() {
            return Err(ActionIdError::EmptyRecordId);
        }

        if trimmed.contains(ACTION_SEPARATOR) {
            return Err(ActionIdError::NestedSeparator);
        }

        if let Some(c) = trimmed
            .chars()
            .find(|c| c.is_whitespace() || c.is_control())
        {
            return Err(ActionIdError::InvalidCharacter(c));
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the record id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `RecordId` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RecordId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Split a raw action id into its kind and record id.
///
/// # Errors
///
/// Returns an error if the id does not match `(approve|reject)_action_<id>`.
pub fn split_action_id(raw: &str) -> Result<(ActionKind, RecordId), ActionIdError> {
    let (kind, record) = raw
        .split_once(ACTION_SEPARATOR)
        .ok_or(ActionIdError::MissingSeparator)?;

    let kind = kind.parse::<ActionKind>()?;
    let record_id = RecordId::parse(record)?;

    Ok((kind, record_id))
}
