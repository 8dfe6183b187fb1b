//! Identity of the reviewer who clicked a decision button.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Prefix of the fallback label used when no email is known for an actor.
pub const FALLBACK_PREFIX: &str = "SlackUser-";

/// Reference to the chat user behind an interaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorRef {
    /// Slack user ID (e.g. `U024BE7LH`).
    pub user_id: String,
    /// Slack username, if the payload carried one.
    #[serde(default)]
    pub username: Option<String>,
    /// Display name, if the payload carried one.
    #[serde(default)]
    pub name: Option<String>,
}

impl ActorRef {
    /// Create an actor reference from a bare user ID.
    #[must_use]
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            username: None,
            name: None,
        }
    }

    /// Label derived from the user ID alone. Never empty.
    #[must_use]
    pub fn fallback_label(&self) -> String {
        let id = self.user_id.trim();
        if id.is_empty() {
            format!("{FALLBACK_PREFIX}unknown")
        } else {
            format!("{FALLBACK_PREFIX}{id}")
        }
    }
}

/// How an actor is shown in the CRM payload and the audit trace.
///
/// Either the email address from the user's chat profile or, when the
/// profile has none, a stable label derived from the user ID.
///
/// ```
/// use approval_relay_core::{ActorDisplay, ActorRef};
///
/// let actor = ActorRef::new("U123");
/// assert_eq!(ActorDisplay::resolve(&actor, Some("a@x.com")).as_str(), "a@x.com");
/// assert_eq!(ActorDisplay::resolve(&actor, None).as_str(), "SlackUser-U123");
/// assert_eq!(ActorDisplay::resolve(&actor, Some("not-an-email")).as_str(), "SlackUser-U123");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum ActorDisplay {
    /// Email address from the actor's profile.
    Email(String),
    /// Label derived from the actor's user ID.
    Fallback(String),
}

impl ActorDisplay {
    /// Pick the display identity for `actor`, preferring a usable email.
    #[must_use]
    pub fn resolve(actor: &ActorRef, email: Option<&str>) -> Self {
        match email.map(str::trim) {
            Some(email) if looks_like_email(email) => Self::Email(email.to_owned()),
            _ => Self::Fallback(actor.fallback_label()),
        }
    }

    /// Returns the display string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Email(s) | Self::Fallback(s) => s,
        }
    }

    /// Whether the display came from a real email address.
    #[must_use]
    pub const fn is_email(&self) -> bool {
        matches!(self, Self::Email(_))
    }
}

impl fmt::Display for ActorDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structural email check: a non-empty local part and domain around one `@`.
fn looks_like_email(s: &str) -> bool {
    match s.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    }
}
