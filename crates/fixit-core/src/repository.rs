//! Repository and collaborator trait definitions.
//!
//! All operations are async. Ids are plain strings; the store's own
//! identity type never leaks past an implementation.

use crate::error::FixItResult;
use crate::models::{
    ticket::{NewTicket, Ticket, TicketChange, TicketFilter},
    user::Actor,
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

// ---------------------------------------------------------------------------
// Tickets
// ---------------------------------------------------------------------------

pub trait TicketRepository: Send + Sync {
    /// Persist a new ticket with status `open`, version 1 and a timeline
    /// holding only the creation event.
    fn create(&self, input: NewTicket) -> impl Future<Output = FixItResult<Ticket>> + Send;

    fn get_by_id(&self, id: &str) -> impl Future<Output = FixItResult<Ticket>> + Send;

    /// Apply `change` in one atomic write if the stored version still
    /// equals `expected_version`, bumping the version.
    ///
    /// Returns `Ok(None)` when the version check fails (or the ticket has
    /// disappeared) so the caller can reload and retry.
    fn update_if_version(
        &self,
        id: &str,
        expected_version: u64,
        change: TicketChange,
    ) -> impl Future<Output = FixItResult<Option<Ticket>>> + Send;

    /// Hard delete, only if the stored version still equals
    /// `expected_version`.
    ///
    /// Returns `Ok(false)` when nothing was deleted so the caller can
    /// reload and re-check.
    fn delete_if_version(
        &self,
        id: &str,
        expected_version: u64,
    ) -> impl Future<Output = FixItResult<bool>> + Send;

    fn list(
        &self,
        filter: TicketFilter,
        pagination: Pagination,
    ) -> impl Future<Output = FixItResult<PaginatedResult<Ticket>>> + Send;
}

// ---------------------------------------------------------------------------
// External collaborators
// ---------------------------------------------------------------------------

/// Identity collaborator: resolves a user id to its role and building.
pub trait UserDirectory: Send + Sync {
    fn get_actor(&self, uid: &str) -> impl Future<Output = FixItResult<Actor>> + Send;
}

/// Image storage collaborator.
pub trait ImageStore: Send + Sync {
    /// Delete the stored assets behind the given public ids.
    fn delete_images(&self, public_ids: &[String]) -> impl Future<Output = FixItResult<()>> + Send;
}
