//! FixItNow Tickets — the status transition graph, per-ticket access
//! control, the ticket mutation service, and keyword triage.

pub mod access;
pub mod config;
pub mod error;
pub mod service;
pub mod transition;
pub mod triage;

pub use access::{AccessDecision, AccessEvaluator, AccessLevel};
pub use config::TicketConfig;
pub use error::TicketError;
pub use service::{TicketActions, TicketService};
