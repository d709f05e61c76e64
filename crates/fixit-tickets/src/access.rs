//! Per-ticket view/modify/delete decisions.
//!
//! Independent of the status graph: these answer "may this user touch
//! this ticket at all, and for which kind of action".

use fixit_core::models::ticket::{Ticket, TicketStatus};
use fixit_core::models::user::{Actor, Role};
use serde::Serialize;

pub const NOT_ASSIGNED_TO_YOU: &str = "Ticket not assigned to you";
pub const NOT_YOUR_TICKET: &str = "Not your ticket";
pub const OTHER_BUILDING: &str = "Ticket belongs to another building";
pub const TECHNICIAN_CANNOT_DELETE: &str = "Technicians cannot delete tickets";
pub const DELETE_ONLY_WHILE_OPEN: &str = "Ticket can only be deleted while open";

/// Outcome of a permission check, with the reason shown to the user on
/// denial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessDecision {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl AccessDecision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub fn deny(reason: &str) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }

    /// Denial reason, or an empty string when allowed.
    pub fn reason_or_default(&self) -> &str {
        self.reason.as_deref().unwrap_or_default()
    }
}

/// All three permissions at once, for rendering affordances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessLevel {
    pub can_view: bool,
    pub can_modify: bool,
    pub can_delete: bool,
}

/// Evaluates ownership, assignment and building membership.
#[derive(Debug, Clone, Copy)]
pub struct AccessEvaluator {
    /// Confine admins to tickets of their own building.
    pub scope_admins_to_building: bool,
}

impl Default for AccessEvaluator {
    fn default() -> Self {
        Self {
            scope_admins_to_building: true,
        }
    }
}

impl AccessEvaluator {
    pub fn new(scope_admins_to_building: bool) -> Self {
        Self {
            scope_admins_to_building,
        }
    }

    fn admin_decision(&self, ticket: &Ticket, actor: &Actor) -> AccessDecision {
        if !self.scope_admins_to_building || actor.belongs_to(&ticket.building_id) {
            AccessDecision::allow()
        } else {
            AccessDecision::deny(OTHER_BUILDING)
        }
    }

    pub fn can_access(&self, ticket: &Ticket, actor: &Actor) -> bool {
        self.can_modify(ticket, actor).allowed
    }

    /// Same ownership rules as [`can_access`](Self::can_access), with a
    /// reason on denial.
    pub fn can_modify(&self, ticket: &Ticket, actor: &Actor) -> AccessDecision {
        match actor.role {
            Role::Admin => self.admin_decision(ticket, actor),
            Role::Technician if ticket.is_assigned_to(&actor.uid) => AccessDecision::allow(),
            Role::Technician => AccessDecision::deny(NOT_ASSIGNED_TO_YOU),
            Role::Resident if ticket.is_created_by(&actor.uid) => AccessDecision::allow(),
            Role::Resident => AccessDecision::deny(NOT_YOUR_TICKET),
        }
    }

    /// Stricter than modify: technicians never delete, residents only
    /// their own tickets and only while still open.
    pub fn can_delete(&self, ticket: &Ticket, actor: &Actor) -> AccessDecision {
        match actor.role {
            Role::Admin => self.admin_decision(ticket, actor),
            Role::Technician => AccessDecision::deny(TECHNICIAN_CANNOT_DELETE),
            Role::Resident if !ticket.is_created_by(&actor.uid) => {
                AccessDecision::deny(NOT_YOUR_TICKET)
            }
            Role::Resident if ticket.status != TicketStatus::Open => {
                AccessDecision::deny(DELETE_ONLY_WHILE_OPEN)
            }
            Role::Resident => AccessDecision::allow(),
        }
    }

    pub fn access_level(&self, ticket: &Ticket, actor: &Actor) -> AccessLevel {
        AccessLevel {
            can_view: self.can_access(ticket, actor),
            can_modify: self.can_modify(ticket, actor).allowed,
            can_delete: self.can_delete(ticket, actor).allowed,
        }
    }
}
