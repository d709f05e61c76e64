//! Ticket lifecycle error types.

use fixit_core::error::FixItError;
use fixit_core::models::ticket::TicketStatus;
use fixit_core::models::user::Role;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TicketError {
    #[error("Not authorized to access this ticket")]
    AccessDenied,

    #[error("{0}")]
    ActionDenied(String),

    #[error("Cannot transition from {from} to {to} with your role")]
    InvalidTransition {
        from: TicketStatus,
        to: TicketStatus,
        role: Role,
    },

    #[error("Only admins can assign technicians")]
    NotAnAdmin,

    #[error("User {0} is not a technician")]
    NotATechnician(String),

    #[error("Technician {uid} does not serve building {building_id}")]
    TechnicianOutsideBuilding { uid: String, building_id: String },

    #[error("User is not associated with a building")]
    MissingBuilding,

    #[error("Ticket title must not be empty")]
    EmptyTitle,

    #[error("No changes supplied")]
    NothingToUpdate,

    #[error("ticket {0} kept changing underneath the update")]
    Conflict(String),
}

impl From<TicketError> for FixItError {
    fn from(err: TicketError) -> Self {
        match err {
            TicketError::AccessDenied => FixItError::Unauthorized {
                reason: err.to_string(),
            },
            TicketError::ActionDenied(reason) => FixItError::Forbidden { reason },
            TicketError::NotAnAdmin => FixItError::Forbidden {
                reason: err.to_string(),
            },
            TicketError::InvalidTransition { from, to, role } => FixItError::InvalidTransition {
                from: from.to_string(),
                to: to.to_string(),
                role: role.to_string(),
            },
            TicketError::NotATechnician(_)
            | TicketError::TechnicianOutsideBuilding { .. }
            | TicketError::EmptyTitle
            | TicketError::NothingToUpdate => FixItError::Validation {
                message: err.to_string(),
            },
            TicketError::MissingBuilding => FixItError::MissingBuilding,
            TicketError::Conflict(id) => FixItError::Conflict { id },
        }
    }
}
