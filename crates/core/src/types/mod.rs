//! Core types for the approval relay.
//!
//! This module provides type-safe wrappers for the approval domain.

pub mod action;
pub mod actor;
pub mod decision;
pub mod request;

pub use action::{ACTION_SEPARATOR, ActionIdError, ActionKind, RecordId, split_action_id};
pub use actor::{ActorDisplay, ActorRef};
pub use decision::{CrmDecisionStatus, ResolvedDecision};
pub use request::DecisionRequest;
