//! Acting-user model.
//!
//! User records are owned by the identity provider. The engine only ever
//! reads them as an immutable per-request [`Actor`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FixItError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Technician,
    Resident,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Technician, Role::Resident];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Technician => "technician",
            Role::Resident => "resident",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = FixItError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "technician" => Ok(Role::Technician),
            "resident" => Ok(Role::Resident),
            other => Err(FixItError::Forbidden {
                reason: format!("Invalid role: {other}"),
            }),
        }
    }
}

/// The user on whose behalf an operation runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub uid: String,
    pub display_name: String,
    pub role: Role,
    /// Building the user belongs to. Admins may be unattached while
    /// onboarding.
    pub building_id: Option<String>,
}

impl Actor {
    pub fn new(uid: impl Into<String>, display_name: impl Into<String>, role: Role) -> Self {
        Self {
            uid: uid.into(),
            display_name: display_name.into(),
            role,
            building_id: None,
        }
    }

    pub fn in_building(mut self, building_id: impl Into<String>) -> Self {
        self.building_id = Some(building_id.into());
        self
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn belongs_to(&self, building_id: &str) -> bool {
        self.building_id.as_deref() == Some(building_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_role_is_forbidden() {
        let err = "janitor".parse::<Role>().unwrap_err();
        assert!(matches!(err, FixItError::Forbidden { .. }));
    }

    #[test]
    fn building_membership() {
        let actor = Actor::new("a1", "Ada", Role::Admin).in_building("b1");
        assert!(actor.belongs_to("b1"));
        assert!(!actor.belongs_to("b2"));
        assert!(!Actor::new("a2", "Bo", Role::Admin).belongs_to("b1"));
    }
}
