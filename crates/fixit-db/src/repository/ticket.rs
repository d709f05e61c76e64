//! SurrealDB implementation of [`TicketRepository`].
//!
//! Every mutation is a single `UPDATE` or `DELETE ... WHERE version =
//! $expected` statement, so a status change, its timeline entry and the
//! version bump land together or not at all.

use chrono::{DateTime, Utc};
use fixit_core::error::FixItResult;
use fixit_core::models::ticket::{
    AssigneeChange, LifecycleChange, NewTicket, Ticket, TicketChange, TicketFilter, TicketImage,
    TimelineEvent, UpdateTicketDetails,
};
use fixit_core::repository::{PaginatedResult, Pagination, TicketRepository};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct ImageRow {
    url: String,
    public_id: String,
}

#[derive(Debug, SurrealValue)]
struct TimelineRow {
    status: String,
    occurred_at: DateTime<Utc>,
    actor_id: String,
    user_name: String,
    note: Option<String>,
}

/// DB-side row struct for queries where the id is already known.
#[derive(Debug, SurrealValue)]
struct TicketRow {
    building_id: String,
    title: String,
    description: String,
    category: String,
    priority: String,
    location: String,
    contact_phone: Option<String>,
    images: Vec<ImageRow>,
    status: String,
    created_by: String,
    created_by_name: String,
    assigned_to: Option<String>,
    assigned_to_name: Option<String>,
    assigned_at: Option<DateTime<Utc>>,
    timeline: Vec<TimelineRow>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    accepted_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    version: u64,
}

/// DB-side row struct that includes the record id via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct TicketRowWithId {
    record_id: String,
    building_id: String,
    title: String,
    description: String,
    category: String,
    priority: String,
    location: String,
    contact_phone: Option<String>,
    images: Vec<ImageRow>,
    status: String,
    created_by: String,
    created_by_name: String,
    assigned_to: Option<String>,
    assigned_to_name: Option<String>,
    assigned_at: Option<DateTime<Utc>>,
    timeline: Vec<TimelineRow>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    accepted_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    version: u64,
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

fn corrupt(e: impl std::fmt::Display) -> DbError {
    DbError::Corrupt(e.to_string())
}

impl TimelineRow {
    fn into_event(self) -> Result<TimelineEvent, DbError> {
        Ok(TimelineEvent {
            status: self.status.parse().map_err(corrupt)?,
            timestamp: self.occurred_at,
            by: self.actor_id,
            user_name: self.user_name,
            note: self.note,
        })
    }
}

impl TicketRow {
    fn into_ticket(self, id: String) -> Result<Ticket, DbError> {
        let timeline = self
            .timeline
            .into_iter()
            .map(TimelineRow::into_event)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Ticket {
            id,
            building_id: self.building_id,
            title: self.title,
            description: self.description,
            category: self.category.parse().map_err(corrupt)?,
            priority: self.priority.parse().map_err(corrupt)?,
            location: self.location,
            contact_phone: self.contact_phone,
            images: self
                .images
                .into_iter()
                .map(|i| TicketImage {
                    url: i.url,
                    public_id: i.public_id,
                })
                .collect(),
            status: self.status.parse().map_err(corrupt)?,
            created_by: self.created_by,
            created_by_name: self.created_by_name,
            assigned_to: self.assigned_to,
            assigned_to_name: self.assigned_to_name,
            assigned_at: self.assigned_at,
            timeline,
            created_at: self.created_at,
            updated_at: self.updated_at,
            accepted_at: self.accepted_at,
            completed_at: self.completed_at,
            version: self.version,
        })
    }
}

impl TicketRowWithId {
    fn try_into_ticket(self) -> Result<Ticket, DbError> {
        let id = self.record_id;
        TicketRow {
            building_id: self.building_id,
            title: self.title,
            description: self.description,
            category: self.category,
            priority: self.priority,
            location: self.location,
            contact_phone: self.contact_phone,
            images: self.images,
            status: self.status,
            created_by: self.created_by,
            created_by_name: self.created_by_name,
            assigned_to: self.assigned_to,
            assigned_to_name: self.assigned_to_name,
            assigned_at: self.assigned_at,
            timeline: self.timeline,
            created_at: self.created_at,
            updated_at: self.updated_at,
            accepted_at: self.accepted_at,
            completed_at: self.completed_at,
            version: self.version,
        }
        .into_ticket(id)
    }
}

/// SurrealDB implementation of the Ticket repository.
#[derive(Clone)]
pub struct SurrealTicketRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealTicketRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn apply_lifecycle(
        &self,
        id: &str,
        expected_version: u64,
        change: LifecycleChange,
    ) -> Result<Vec<TicketRow>, DbError> {
        let mut sets = vec![
            "status = $status",
            "updated_at = $updated_at",
            "timeline += { status: $status, occurred_at: $event_at, \
             actor_id: $event_by, user_name: $event_user_name, note: $event_note }",
        ];
        if change.accepted_at.is_some() {
            sets.push("accepted_at = $accepted_at");
        }
        if change.completed_at.is_some() {
            sets.push("completed_at = $completed_at");
        }
        match change.assignee {
            AssigneeChange::Keep => {}
            AssigneeChange::Set(_) => {
                sets.push("assigned_to = $assigned_to");
                sets.push("assigned_to_name = $assigned_to_name");
                sets.push("assigned_at = $assigned_at");
            }
            AssigneeChange::Clear => {
                sets.push("assigned_to = NONE");
                sets.push("assigned_to_name = NONE");
                sets.push("assigned_at = NONE");
            }
        }
        sets.push("version += 1");

        let query = format!(
            "UPDATE type::record('ticket', $id) SET {} \
             WHERE version = $expected_version",
            sets.join(", ")
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("id", id.to_string()))
            .bind(("expected_version", expected_version))
            .bind(("status", change.status.as_str().to_string()))
            .bind(("updated_at", change.updated_at))
            .bind(("event_at", change.event.timestamp))
            .bind(("event_by", change.event.by))
            .bind(("event_user_name", change.event.user_name))
            .bind(("event_note", change.event.note));

        if let Some(accepted_at) = change.accepted_at {
            builder = builder.bind(("accepted_at", accepted_at));
        }
        if let Some(completed_at) = change.completed_at {
            builder = builder.bind(("completed_at", completed_at));
        }
        if let AssigneeChange::Set(assignee) = change.assignee {
            builder = builder
                .bind(("assigned_to", assignee.uid))
                .bind(("assigned_to_name", assignee.name))
                .bind(("assigned_at", assignee.assigned_at));
        }

        let result = builder.await?;
        let mut result = result.check().map_err(|e| DbError::Corrupt(e.to_string()))?;
        Ok(result.take(0)?)
    }

    async fn apply_details(
        &self,
        id: &str,
        expected_version: u64,
        details: UpdateTicketDetails,
        updated_at: DateTime<Utc>,
    ) -> Result<Vec<TicketRow>, DbError> {
        let mut sets = Vec::new();
        if details.title.is_some() {
            sets.push("title = $title");
        }
        if details.description.is_some() {
            sets.push("description = $description");
        }
        if details.category.is_some() {
            sets.push("category = $category");
        }
        if details.priority.is_some() {
            sets.push("priority = $priority");
        }
        if details.location.is_some() {
            sets.push("location = $location");
        }
        if details.contact_phone.is_some() {
            sets.push("contact_phone = $contact_phone");
        }
        sets.push("updated_at = $updated_at");
        sets.push("version += 1");

        let query = format!(
            "UPDATE type::record('ticket', $id) SET {} \
             WHERE version = $expected_version",
            sets.join(", ")
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("id", id.to_string()))
            .bind(("expected_version", expected_version))
            .bind(("updated_at", updated_at));

        if let Some(title) = details.title {
            builder = builder.bind(("title", title));
        }
        if let Some(description) = details.description {
            builder = builder.bind(("description", description));
        }
        if let Some(category) = details.category {
            builder = builder.bind(("category", category.as_str().to_string()));
        }
        if let Some(priority) = details.priority {
            builder = builder.bind(("priority", priority.as_str().to_string()));
        }
        if let Some(location) = details.location {
            builder = builder.bind(("location", location));
        }
        if let Some(contact_phone) = details.contact_phone {
            // Some(None) clears the field.
            builder = builder.bind(("contact_phone", contact_phone));
        }

        let result = builder.await?;
        let mut result = result.check().map_err(|e| DbError::Corrupt(e.to_string()))?;
        Ok(result.take(0)?)
    }
}

impl<C: Connection> TicketRepository for SurrealTicketRepository<C> {
    async fn create(&self, input: NewTicket) -> FixItResult<Ticket> {
        let id = Uuid::new_v4().to_string();

        let images: Vec<ImageRow> = input
            .images
            .into_iter()
            .map(|i| ImageRow {
                url: i.url,
                public_id: i.public_id,
            })
            .collect();

        let result = self
            .db
            .query(
                "CREATE type::record('ticket', $id) SET \
                 building_id = $building_id, \
                 title = $title, description = $description, \
                 category = $category, priority = $priority, \
                 location = $location, contact_phone = $contact_phone, \
                 images = $images, \
                 status = $status, \
                 created_by = $created_by, created_by_name = $created_by_name, \
                 assigned_to = NONE, assigned_to_name = NONE, assigned_at = NONE, \
                 timeline = [{ status: $status, occurred_at: $event_at, \
                 actor_id: $event_by, user_name: $event_user_name, note: $event_note }], \
                 created_at = $created_at, updated_at = $created_at, \
                 accepted_at = NONE, completed_at = NONE, \
                 version = 1",
            )
            .bind(("id", id.clone()))
            .bind(("building_id", input.building_id))
            .bind(("title", input.title))
            .bind(("description", input.description))
            .bind(("category", input.category.as_str().to_string()))
            .bind(("priority", input.priority.as_str().to_string()))
            .bind(("location", input.location))
            .bind(("contact_phone", input.contact_phone))
            .bind(("images", images))
            .bind(("status", input.created_event.status.as_str().to_string()))
            .bind(("created_by", input.created_by))
            .bind(("created_by_name", input.created_by_name))
            .bind(("event_at", input.created_event.timestamp))
            .bind(("event_by", input.created_event.by))
            .bind(("event_user_name", input.created_event.user_name))
            .bind(("event_note", input.created_event.note))
            .bind(("created_at", input.created_at))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Corrupt(e.to_string()))?;

        let rows: Vec<TicketRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "ticket".into(),
            id: id.clone(),
        })?;

        Ok(row.into_ticket(id)?)
    }

    async fn get_by_id(&self, id: &str) -> FixItResult<Ticket> {
        let mut result = self
            .db
            .query("SELECT * FROM type::record('ticket', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<TicketRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "ticket".into(),
            id: id.to_string(),
        })?;

        Ok(row.into_ticket(id.to_string())?)
    }

    async fn update_if_version(
        &self,
        id: &str,
        expected_version: u64,
        change: TicketChange,
    ) -> FixItResult<Option<Ticket>> {
        let rows = match change {
            TicketChange::Lifecycle(change) => {
                self.apply_lifecycle(id, expected_version, change).await?
            }
            TicketChange::Details {
                details,
                updated_at,
            } => {
                self.apply_details(id, expected_version, details, updated_at)
                    .await?
            }
        };

        match rows.into_iter().next() {
            Some(row) => Ok(Some(row.into_ticket(id.to_string())?)),
            None => Ok(None),
        }
    }

    async fn delete_if_version(&self, id: &str, expected_version: u64) -> FixItResult<bool> {
        let result = self
            .db
            .query(
                "DELETE type::record('ticket', $id) \
                 WHERE version = $expected_version RETURN BEFORE",
            )
            .bind(("id", id.to_string()))
            .bind(("expected_version", expected_version))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Corrupt(e.to_string()))?;

        let removed: Vec<TicketRow> = result.take(0).map_err(DbError::from)?;
        Ok(!removed.is_empty())
    }

    async fn list(
        &self,
        filter: TicketFilter,
        pagination: Pagination,
    ) -> FixItResult<PaginatedResult<Ticket>> {
        let mut conditions = Vec::new();
        if filter.building_id.is_some() {
            conditions.push("building_id = $building_id");
        }
        if filter.created_by.is_some() {
            conditions.push("created_by = $created_by");
        }
        if filter.assigned_to.is_some() {
            conditions.push("assigned_to = $assigned_to");
        }
        if filter.status.is_some() {
            conditions.push("status = $status");
        }
        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let count_query = format!("SELECT count() AS total FROM ticket {where_clause} GROUP ALL");
        let page_query = format!(
            "SELECT meta::id(id) AS record_id, * FROM ticket {where_clause} \
             ORDER BY created_at DESC \
             LIMIT $limit START $offset"
        );

        let mut builder = self
            .db
            .query(&count_query)
            .query(&page_query)
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset));
        if let Some(building_id) = filter.building_id {
            builder = builder.bind(("building_id", building_id));
        }
        if let Some(created_by) = filter.created_by {
            builder = builder.bind(("created_by", created_by));
        }
        if let Some(assigned_to) = filter.assigned_to {
            builder = builder.bind(("assigned_to", assigned_to));
        }
        if let Some(status) = filter.status {
            builder = builder.bind(("status", status.as_str().to_string()));
        }

        let mut result = builder.await.map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);
        let rows: Vec<TicketRowWithId> = result.take(1).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(TicketRowWithId::try_into_ticket)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
