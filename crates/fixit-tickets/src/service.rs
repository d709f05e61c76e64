//! Ticket mutation service — the only writer of ticket status and
//! assignment state.
//!
//! Every mutation loads the ticket, runs the access check and the
//! transition check against that snapshot, then writes with a version
//! condition. A lost race re-runs the whole cycle against fresh state.

use chrono::{DateTime, Utc};
use fixit_core::error::{FixItError, FixItResult};
use fixit_core::models::ticket::{
    Assignee, AssigneeChange, CreateTicket, LifecycleChange, NewTicket, Ticket, TicketChange,
    TicketFilter, TicketStatus, TimelineEvent, UpdateTicketDetails,
};
use fixit_core::models::user::{Actor, Role};
use fixit_core::repository::{
    ImageStore, PaginatedResult, Pagination, TicketRepository, UserDirectory,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::access::{AccessEvaluator, AccessLevel};
use crate::config::TicketConfig;
use crate::error::TicketError;
use crate::transition;

/// What an actor may do with a ticket right now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketActions {
    pub access: AccessLevel,
    pub transitions: Vec<TicketStatus>,
}

/// Ticket service.
///
/// Generic over repository and collaborator implementations so that the
/// lifecycle layer has no dependency on the database crate.
pub struct TicketService<T: TicketRepository, U: UserDirectory, I: ImageStore> {
    tickets: T,
    users: U,
    images: I,
    access: AccessEvaluator,
    config: TicketConfig,
}

impl<T: TicketRepository, U: UserDirectory, I: ImageStore> TicketService<T, U, I> {
    pub fn new(tickets: T, users: U, images: I, config: TicketConfig) -> Self {
        Self {
            tickets,
            users,
            images,
            access: AccessEvaluator::new(config.scope_admins_to_building),
            config,
        }
    }

    pub fn access(&self) -> &AccessEvaluator {
        &self.access
    }

    /// File a new ticket. It always starts `open` with a single
    /// "Ticket created" timeline entry.
    pub async fn create_ticket(&self, input: CreateTicket, creator: &Actor) -> FixItResult<Ticket> {
        let building_id = input
            .building_id
            .or_else(|| creator.building_id.clone())
            .filter(|b| !b.trim().is_empty())
            .ok_or(TicketError::MissingBuilding)?;

        if input.title.trim().is_empty() {
            return Err(TicketError::EmptyTitle.into());
        }

        let now = Utc::now();
        let ticket = self
            .tickets
            .create(NewTicket {
                building_id,
                title: input.title,
                description: input.description,
                category: input.category,
                priority: input.priority,
                location: input.location,
                contact_phone: input.contact_phone,
                images: input.images,
                created_by: creator.uid.clone(),
                created_by_name: creator.display_name.clone(),
                created_event: TimelineEvent {
                    status: TicketStatus::Open,
                    timestamp: now,
                    by: creator.uid.clone(),
                    user_name: creator.display_name.clone(),
                    note: Some("Ticket created".into()),
                },
                created_at: now,
            })
            .await?;

        info!(
            ticket_id = %ticket.id,
            building_id = %ticket.building_id,
            created_by = %ticket.created_by,
            "Ticket created"
        );
        Ok(ticket)
    }

    /// Fetch a ticket the actor is allowed to see.
    pub async fn get_ticket(&self, ticket_id: &str, actor: &Actor) -> FixItResult<Ticket> {
        let ticket = self.tickets.get_by_id(ticket_id).await?;
        if !self.access.can_access(&ticket, actor) {
            debug!(ticket_id, actor = %actor.uid, "Read denied");
            return Err(TicketError::AccessDenied.into());
        }
        Ok(ticket)
    }

    /// Move a ticket to `new_status`.
    ///
    /// Checks, in order: the ticket exists, the actor can access it, the
    /// actor's role may take the edge. Appends exactly one timeline entry.
    pub async fn update_status(
        &self,
        ticket_id: &str,
        new_status: TicketStatus,
        actor: &Actor,
        note: Option<String>,
    ) -> FixItResult<Ticket> {
        for attempt in 0..=self.config.max_conflict_retries {
            let ticket = self.tickets.get_by_id(ticket_id).await?;

            if !self.access.can_access(&ticket, actor) {
                debug!(ticket_id, actor = %actor.uid, "Status change denied: no access");
                return Err(TicketError::AccessDenied.into());
            }

            let from = ticket.status;
            if !transition::can_role_perform_transition(actor.role, from, new_status) {
                debug!(
                    ticket_id,
                    actor = %actor.uid,
                    %from,
                    to = %new_status,
                    "Status change denied: transition not allowed"
                );
                return Err(TicketError::InvalidTransition {
                    from,
                    to: new_status,
                    role: actor.role,
                }
                .into());
            }

            if new_status.requires_assignee() && ticket.assigned_to.is_none() {
                warn!(
                    ticket_id,
                    actor = %actor.uid,
                    to = %new_status,
                    "Ticket enters an assigned status without an assignee"
                );
            }

            let change = status_change(&ticket, new_status, actor, note.clone(), Utc::now());
            if let Some(updated) = self
                .tickets
                .update_if_version(ticket_id, ticket.version, TicketChange::Lifecycle(change))
                .await?
            {
                info!(
                    ticket_id,
                    actor = %actor.uid,
                    %from,
                    to = %new_status,
                    "Ticket status updated"
                );
                return Ok(updated);
            }

            debug!(ticket_id, attempt, "Version conflict on status change, retrying");
        }

        Err(TicketError::Conflict(ticket_id.to_string()).into())
    }

    /// Administrative reassignment: bind a technician and force the ticket
    /// to `assigned`, whatever its current status.
    ///
    /// This is the only write that bypasses the transition graph.
    pub async fn assign_technician(
        &self,
        ticket_id: &str,
        technician_uid: &str,
        admin: &Actor,
    ) -> FixItResult<Ticket> {
        let admin = self.resolve_admin(admin).await?;

        let technician = self.users.get_actor(technician_uid).await?;
        if technician.role != Role::Technician {
            return Err(TicketError::NotATechnician(technician.uid).into());
        }

        for attempt in 0..=self.config.max_conflict_retries {
            let ticket = self.tickets.get_by_id(ticket_id).await?;

            if !self.access.can_access(&ticket, &admin) {
                debug!(ticket_id, actor = %admin.uid, "Assignment denied: no access");
                return Err(TicketError::AccessDenied.into());
            }
            if !technician.belongs_to(&ticket.building_id) {
                return Err(TicketError::TechnicianOutsideBuilding {
                    uid: technician.uid,
                    building_id: ticket.building_id,
                }
                .into());
            }

            let from = ticket.status;
            if !transition::is_transition_legal(from, TicketStatus::Assigned) {
                warn!(
                    ticket_id,
                    actor = %admin.uid,
                    %from,
                    "Reassignment overrides the status graph"
                );
            }

            let now = Utc::now();
            let change = LifecycleChange {
                status: TicketStatus::Assigned,
                event: TimelineEvent {
                    status: TicketStatus::Assigned,
                    timestamp: now,
                    by: admin.uid.clone(),
                    user_name: admin.display_name.clone(),
                    note: Some(format!("Assigned to {}", technician.display_name)),
                },
                assignee: AssigneeChange::Set(Assignee {
                    uid: technician.uid.clone(),
                    name: technician.display_name.clone(),
                    assigned_at: now,
                }),
                accepted_at: None,
                completed_at: None,
                updated_at: now,
            };

            if let Some(updated) = self
                .tickets
                .update_if_version(ticket_id, ticket.version, TicketChange::Lifecycle(change))
                .await?
            {
                info!(
                    ticket_id,
                    actor = %admin.uid,
                    technician = %technician.uid,
                    %from,
                    "Technician assigned"
                );
                return Ok(updated);
            }

            debug!(ticket_id, attempt, "Version conflict on assignment, retrying");
        }

        Err(TicketError::Conflict(ticket_id.to_string()).into())
    }

    /// Edit free-form ticket content. Status, assignment and timeline are
    /// untouched.
    pub async fn update_details(
        &self,
        ticket_id: &str,
        details: UpdateTicketDetails,
        actor: &Actor,
    ) -> FixItResult<Ticket> {
        if details.is_empty() {
            return Err(TicketError::NothingToUpdate.into());
        }
        if details.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(TicketError::EmptyTitle.into());
        }

        for attempt in 0..=self.config.max_conflict_retries {
            let ticket = self.tickets.get_by_id(ticket_id).await?;

            let decision = self.access.can_modify(&ticket, actor);
            if !decision.allowed {
                debug!(ticket_id, actor = %actor.uid, "Edit denied");
                return Err(TicketError::ActionDenied(decision.reason_or_default().into()).into());
            }

            let change = TicketChange::Details {
                details: details.clone(),
                updated_at: Utc::now(),
            };
            if let Some(updated) = self
                .tickets
                .update_if_version(ticket_id, ticket.version, change)
                .await?
            {
                info!(ticket_id, actor = %actor.uid, "Ticket details updated");
                return Ok(updated);
            }

            debug!(ticket_id, attempt, "Version conflict on edit, retrying");
        }

        Err(TicketError::Conflict(ticket_id.to_string()).into())
    }

    /// Permanently remove a ticket, then ask image storage to drop its
    /// images. Storage failures are logged, not returned.
    ///
    /// The delete is conditional on the version the permission check saw,
    /// so a concurrent assignment re-runs the check against fresh state.
    pub async fn delete_ticket(&self, ticket_id: &str, actor: &Actor) -> FixItResult<()> {
        let mut deleted = None;
        for attempt in 0..=self.config.max_conflict_retries {
            let ticket = self.tickets.get_by_id(ticket_id).await?;

            let decision = self.access.can_delete(&ticket, actor);
            if !decision.allowed {
                debug!(ticket_id, actor = %actor.uid, "Delete denied");
                return Err(TicketError::ActionDenied(decision.reason_or_default().into()).into());
            }

            if self
                .tickets
                .delete_if_version(ticket_id, ticket.version)
                .await?
            {
                deleted = Some(ticket);
                break;
            }

            debug!(ticket_id, attempt, "Version conflict on delete, retrying");
        }

        let Some(ticket) = deleted else {
            return Err(TicketError::Conflict(ticket_id.to_string()).into());
        };
        info!(ticket_id, actor = %actor.uid, "Ticket deleted");

        let public_ids = ticket.image_public_ids();
        if !public_ids.is_empty() {
            if let Err(e) = self.images.delete_images(&public_ids).await {
                warn!(
                    ticket_id,
                    images = public_ids.len(),
                    error = %e,
                    "Failed to delete ticket images"
                );
            }
        }

        Ok(())
    }

    /// List the tickets the actor can see, newest first.
    pub async fn list_tickets(
        &self,
        actor: &Actor,
        status: Option<TicketStatus>,
        pagination: Pagination,
    ) -> FixItResult<PaginatedResult<Ticket>> {
        let mut filter = TicketFilter {
            status,
            ..Default::default()
        };
        match actor.role {
            Role::Admin if self.config.scope_admins_to_building => {
                let building_id = actor
                    .building_id
                    .clone()
                    .ok_or(TicketError::MissingBuilding)?;
                filter.building_id = Some(building_id);
            }
            Role::Admin => {}
            Role::Technician => filter.assigned_to = Some(actor.uid.clone()),
            Role::Resident => filter.created_by = Some(actor.uid.clone()),
        }

        let pagination = Pagination {
            offset: pagination.offset,
            limit: pagination.limit.min(self.config.max_page_size),
        };
        self.tickets.list(filter, pagination).await
    }

    /// Permissions plus the status moves the actor could make.
    pub async fn available_actions(
        &self,
        ticket_id: &str,
        actor: &Actor,
    ) -> FixItResult<TicketActions> {
        let ticket = self.tickets.get_by_id(ticket_id).await?;
        let access = self.access.access_level(&ticket, actor);
        let transitions = if access.can_view {
            transition::allowed_transitions_for(actor.role, ticket.status)
        } else {
            Vec::new()
        };
        Ok(TicketActions {
            access,
            transitions,
        })
    }

    /// Confirm the assigning user is an admin.
    ///
    /// With `verify_admin_role` the directory record wins over whatever
    /// the caller asserted.
    async fn resolve_admin(&self, asserted: &Actor) -> FixItResult<Actor> {
        let actor = if self.config.verify_admin_role {
            match self.users.get_actor(&asserted.uid).await {
                Ok(actor) => actor,
                Err(FixItError::NotFound { .. }) => return Err(TicketError::NotAnAdmin.into()),
                Err(e) => return Err(e),
            }
        } else {
            asserted.clone()
        };

        if !actor.is_admin() {
            debug!(actor = %actor.uid, role = %actor.role, "Assignment denied: not an admin");
            return Err(TicketError::NotAnAdmin.into());
        }
        Ok(actor)
    }
}

/// Build the write for a status change on `ticket`.
fn status_change(
    ticket: &Ticket,
    new_status: TicketStatus,
    actor: &Actor,
    note: Option<String>,
    now: DateTime<Utc>,
) -> LifecycleChange {
    // Unassigning sends the ticket back to the pool.
    let assignee = if ticket.status == TicketStatus::Assigned && new_status == TicketStatus::Open
    {
        AssigneeChange::Clear
    } else {
        AssigneeChange::Keep
    };

    LifecycleChange {
        status: new_status,
        event: TimelineEvent {
            status: new_status,
            timestamp: now,
            by: actor.uid.clone(),
            user_name: actor.display_name.clone(),
            note,
        },
        assignee,
        accepted_at: (new_status == TicketStatus::Accepted).then_some(now),
        completed_at: (new_status == TicketStatus::Completed).then_some(now),
        updated_at: now,
    }
}
