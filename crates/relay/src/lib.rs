//! Case Approval Relay library.
//!
//! Receives Approve/Reject clicks on Slack approval requests, annotates the
//! message with the decision, records it on the Salesforce Case and posts
//! an audit reply in the thread.
//!
//! # Security
//!
//! The process holds a Slack bot token and a Salesforce credential that can
//! change approval state on Cases. Every webhook is checked against the
//! Slack signing secret before its body is parsed.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod retry;
pub mod routes;
pub mod salesforce;
pub mod services;
pub mod slack;
pub mod state;
