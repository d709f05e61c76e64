//! FixItNow Core — domain models, the error taxonomy, and the
//! persistence and collaborator traits the ticket engine depends on.

pub mod error;
pub mod models;
pub mod repository;
