//! Ticket status graph and per-role transition whitelists.
//!
//! ```text
//! open        -> assigned
//! assigned    -> accepted, open
//! accepted    -> in_progress, assigned
//! in_progress -> completed, accepted
//! completed   -> open
//! ```
//!
//! The graph is cyclic: `completed -> open` reopens a ticket. A request
//! for the ticket's current status is always legal.

use fixit_core::models::ticket::TicketStatus::{
    self, Accepted, Assigned, Completed, InProgress, Open,
};
use fixit_core::models::user::Role;

/// Edges a technician may take: accept, start, complete, pause, decline.
static TECHNICIAN_EDGES: &[(TicketStatus, TicketStatus)] = &[
    (Assigned, Accepted),
    (Accepted, InProgress),
    (InProgress, Completed),
    (InProgress, Accepted),
    (Accepted, Assigned),
];

/// Edges a resident may take: acknowledge and reopen a completed ticket.
static RESIDENT_EDGES: &[(TicketStatus, TicketStatus)] = &[(Completed, Open)];

/// Adjacency list of `from`.
pub fn allowed_next_statuses(from: TicketStatus) -> &'static [TicketStatus] {
    match from {
        Open => &[Assigned],
        Assigned => &[Accepted, Open],
        Accepted => &[InProgress, Assigned],
        InProgress => &[Completed, Accepted],
        Completed => &[Open],
    }
}

/// True iff `to == from` or `to` is adjacent to `from`.
pub fn is_transition_legal(from: TicketStatus, to: TicketStatus) -> bool {
    from == to || allowed_next_statuses(from).contains(&to)
}

/// Whether `role` may move a ticket from `from` to `to`.
///
/// Requires a legal edge first, then the role's whitelist. Admins may
/// take any legal edge. No-op requests pass for every role.
pub fn can_role_perform_transition(role: Role, from: TicketStatus, to: TicketStatus) -> bool {
    if !is_transition_legal(from, to) {
        return false;
    }
    if from == to {
        return true;
    }
    match role {
        Role::Admin => true,
        Role::Technician => TECHNICIAN_EDGES.contains(&(from, to)),
        Role::Resident => RESIDENT_EDGES.contains(&(from, to)),
    }
}

/// The next statuses `role` may pick from `from`, in graph order.
pub fn allowed_transitions_for(role: Role, from: TicketStatus) -> Vec<TicketStatus> {
    allowed_next_statuses(from)
        .iter()
        .copied()
        .filter(|&to| can_role_perform_transition(role, from, to))
        .collect()
}
