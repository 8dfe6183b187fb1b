//! Case Approval Relay Core - Domain types library.
//!
//! This crate provides the types shared by the relay service and its tests:
//! - decoding of interactive action identifiers into decision requests
//! - the fixed mapping from action kind to CRM decision status
//! - actor identity and its display fallback
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients. Everything here runs before the first network call of a relay.
//!
//! # Modules
//!
//! - [`types`] - Action identifiers, record ids, decisions, and actors

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
