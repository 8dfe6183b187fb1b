//! Business logic services for the relay.
//!
//! # Services
//!
//! - `relay` - Orchestrates one Approve/Reject click end to end
//! - `single_flight` - In-flight claims and the recently-decided cache
//! - `audit` - Best-effort audit replies in the request thread
//! - `ports` - Traits for the chat platform and the CRM

pub mod audit;
pub mod ports;
pub mod relay;
pub mod single_flight;

pub use audit::{AuditEntry, AuditNotifier};
pub use ports::{ChatPlatform, CrmGateway};
pub use relay::{DecisionRelay, RelayError, RelayResult, StepOutcome};
pub use single_flight::{DecidedRecords, InFlightGuard, InFlightRecords};
