//! Ticket domain model.
//!
//! A ticket is a maintenance request filed by a resident against the
//! building they live in. It belongs to exactly one building for its
//! whole life and moves through a fixed status lifecycle; every status
//! change is recorded in its append-only timeline.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FixItError;

/// Lifecycle status of a ticket.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    Assigned,
    Accepted,
    InProgress,
    Completed,
}

impl TicketStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [TicketStatus; 5] = [
        TicketStatus::Open,
        TicketStatus::Assigned,
        TicketStatus::Accepted,
        TicketStatus::InProgress,
        TicketStatus::Completed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TicketStatus::Open => "open",
            TicketStatus::Assigned => "assigned",
            TicketStatus::Accepted => "accepted",
            TicketStatus::InProgress => "in_progress",
            TicketStatus::Completed => "completed",
        }
    }

    /// Statuses in which a technician must be bound to the ticket.
    pub fn requires_assignee(self) -> bool {
        matches!(
            self,
            TicketStatus::Assigned | TicketStatus::Accepted | TicketStatus::InProgress
        )
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketStatus {
    type Err = FixItError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(TicketStatus::Open),
            "assigned" => Ok(TicketStatus::Assigned),
            "accepted" => Ok(TicketStatus::Accepted),
            "in_progress" => Ok(TicketStatus::InProgress),
            "completed" => Ok(TicketStatus::Completed),
            other => Err(FixItError::Validation {
                message: format!("unknown ticket status: {other}"),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TicketCategory {
    Plumbing,
    Electrical,
    Hvac,
    Cleaning,
    Carpentry,
    Appliance,
    Painting,
    Landscaping,
    Security,
    Other,
}

impl TicketCategory {
    pub const ALL: [TicketCategory; 10] = [
        TicketCategory::Plumbing,
        TicketCategory::Electrical,
        TicketCategory::Hvac,
        TicketCategory::Cleaning,
        TicketCategory::Carpentry,
        TicketCategory::Appliance,
        TicketCategory::Painting,
        TicketCategory::Landscaping,
        TicketCategory::Security,
        TicketCategory::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TicketCategory::Plumbing => "plumbing",
            TicketCategory::Electrical => "electrical",
            TicketCategory::Hvac => "hvac",
            TicketCategory::Cleaning => "cleaning",
            TicketCategory::Carpentry => "carpentry",
            TicketCategory::Appliance => "appliance",
            TicketCategory::Painting => "painting",
            TicketCategory::Landscaping => "landscaping",
            TicketCategory::Security => "security",
            TicketCategory::Other => "other",
        }
    }
}

impl fmt::Display for TicketCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketCategory {
    type Err = FixItError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TicketCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| FixItError::Validation {
                message: format!("unknown ticket category: {s}"),
            })
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum TicketPriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl TicketPriority {
    pub fn as_str(self) -> &'static str {
        match self {
            TicketPriority::Low => "low",
            TicketPriority::Medium => "medium",
            TicketPriority::High => "high",
            TicketPriority::Urgent => "urgent",
        }
    }
}

impl fmt::Display for TicketPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketPriority {
    type Err = FixItError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(TicketPriority::Low),
            "medium" => Ok(TicketPriority::Medium),
            "high" => Ok(TicketPriority::High),
            "urgent" => Ok(TicketPriority::Urgent),
            other => Err(FixItError::Validation {
                message: format!("unknown ticket priority: {other}"),
            }),
        }
    }
}

/// A single entry of a ticket's timeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEvent {
    pub status: TicketStatus,
    pub timestamp: DateTime<Utc>,
    /// User id of whoever caused the event.
    pub by: String,
    pub user_name: String,
    pub note: Option<String>,
}

/// Reference to an image held by the external storage service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TicketImage {
    pub url: String,
    pub public_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: String,
    pub building_id: String,
    pub title: String,
    pub description: String,
    pub category: TicketCategory,
    pub priority: TicketPriority,
    pub location: String,
    pub contact_phone: Option<String>,
    pub images: Vec<TicketImage>,
    pub status: TicketStatus,
    pub created_by: String,
    /// Display copy of the creator's name, captured at creation time.
    pub created_by_name: String,
    pub assigned_to: Option<String>,
    pub assigned_to_name: Option<String>,
    pub assigned_at: Option<DateTime<Utc>>,
    /// Append-only; the first entry is always the creation event.
    pub timeline: Vec<TimelineEvent>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Optimistic concurrency counter, bumped by every persisted write.
    pub version: u64,
}

impl Ticket {
    pub fn is_assigned_to(&self, uid: &str) -> bool {
        self.assigned_to.as_deref() == Some(uid)
    }

    pub fn is_created_by(&self, uid: &str) -> bool {
        self.created_by == uid
    }

    /// Public ids of every stored image attached to this ticket.
    pub fn image_public_ids(&self) -> Vec<String> {
        self.images.iter().map(|i| i.public_id.clone()).collect()
    }
}

/// Content supplied by a resident when filing a ticket.
///
/// `building_id` is resolved by the caller from the resident's profile;
/// creation fails when it is missing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTicket {
    pub building_id: Option<String>,
    pub title: String,
    pub description: String,
    pub category: TicketCategory,
    pub priority: TicketPriority,
    pub location: String,
    pub contact_phone: Option<String>,
    #[serde(default)]
    pub images: Vec<TicketImage>,
}

/// Fully resolved record handed to the repository on creation.
#[derive(Debug, Clone)]
pub struct NewTicket {
    pub building_id: String,
    pub title: String,
    pub description: String,
    pub category: TicketCategory,
    pub priority: TicketPriority,
    pub location: String,
    pub contact_phone: Option<String>,
    pub images: Vec<TicketImage>,
    pub created_by: String,
    pub created_by_name: String,
    pub created_event: TimelineEvent,
    pub created_at: DateTime<Utc>,
}

/// Free-form content edits. Status and assignment are never changed here.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTicketDetails {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<TicketCategory>,
    pub priority: Option<TicketPriority>,
    pub location: Option<String>,
    /// `Some(Some(val))` = set, `Some(None)` = clear, `None` = no change.
    /// Over JSON: a string sets, `null` clears, an absent key leaves it.
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub contact_phone: Option<Option<String>>,
}

impl UpdateTicketDetails {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.priority.is_none()
            && self.location.is_none()
            && self.contact_phone.is_none()
    }
}

/// Keeps an explicit `null` distinct from a missing key.
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Assignee fields written together by assignment and unassignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignee {
    pub uid: String,
    pub name: String,
    pub assigned_at: DateTime<Utc>,
}

/// What happens to the assignee fields during a lifecycle write.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AssigneeChange {
    #[default]
    Keep,
    Set(Assignee),
    Clear,
}

/// A single lifecycle write: new status, its timeline event, and the
/// bookkeeping fields that travel with it. Applied atomically.
#[derive(Debug, Clone)]
pub struct LifecycleChange {
    pub status: TicketStatus,
    pub event: TimelineEvent,
    pub assignee: AssigneeChange,
    pub accepted_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// Either kind of write the repository can apply under a version check.
#[derive(Debug, Clone)]
pub enum TicketChange {
    Lifecycle(LifecycleChange),
    Details {
        details: UpdateTicketDetails,
        updated_at: DateTime<Utc>,
    },
}

/// Query-level filter for listing tickets.
#[derive(Debug, Clone, Default)]
pub struct TicketFilter {
    pub building_id: Option<String>,
    pub created_by: Option<String>,
    pub assigned_to: Option<String>,
    pub status: Option<TicketStatus>,
}
