//! Ticket engine configuration.

/// Configuration for the ticket service.
#[derive(Debug, Clone)]
pub struct TicketConfig {
    /// How many times a write that lost an optimistic-concurrency race is
    /// re-validated and retried before giving up (default: 3).
    pub max_conflict_retries: u32,
    /// Confine admins to tickets of their own building (default: true).
    pub scope_admins_to_building: bool,
    /// Look the assigning user up in the user directory and require the
    /// admin role there, instead of trusting the caller (default: true).
    pub verify_admin_role: bool,
    /// Upper bound applied to list page sizes (default: 100).
    pub max_page_size: u64,
}

impl Default for TicketConfig {
    fn default() -> Self {
        Self {
            max_conflict_retries: 3,
            scope_admins_to_building: true,
            verify_admin_role: true,
            max_page_size: 100,
        }
    }
}
