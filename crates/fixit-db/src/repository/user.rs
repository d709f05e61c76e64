//! SurrealDB implementation of [`UserDirectory`].
//!
//! The engine only reads users. [`SurrealUserDirectory::register`] is a
//! provisioning helper outside the trait.

use fixit_core::error::FixItResult;
use fixit_core::models::user::{Actor, Role};
use fixit_core::repository::UserDirectory;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct UserRow {
    display_name: String,
    role: String,
    building_id: Option<String>,
}

impl UserRow {
    fn into_actor(self, uid: String) -> Result<Actor, DbError> {
        let role: Role = self
            .role
            .parse()
            .map_err(|e| DbError::Corrupt(format!("user {uid}: {e}")))?;
        Ok(Actor {
            uid,
            display_name: self.display_name,
            role,
            building_id: self.building_id,
        })
    }
}

/// Fields needed to provision a user record.
#[derive(Debug, Clone)]
pub struct RegisterUser {
    pub uid: String,
    pub display_name: String,
    pub role: Role,
    pub building_id: Option<String>,
}

/// SurrealDB-backed identity collaborator.
#[derive(Clone)]
pub struct SurrealUserDirectory<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealUserDirectory<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    /// Create or replace a user record keyed by the provider uid.
    pub async fn register(&self, input: RegisterUser) -> FixItResult<Actor> {
        let result = self
            .db
            .query(
                "UPSERT type::record('app_user', $uid) SET \
                 display_name = $display_name, \
                 role = $role, \
                 building_id = $building_id",
            )
            .bind(("uid", input.uid.clone()))
            .bind(("display_name", input.display_name))
            .bind(("role", input.role.as_str().to_string()))
            .bind(("building_id", input.building_id))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Corrupt(e.to_string()))?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: input.uid.clone(),
        })?;

        Ok(row.into_actor(input.uid)?)
    }
}

impl<C: Connection> UserDirectory for SurrealUserDirectory<C> {
    async fn get_actor(&self, uid: &str) -> FixItResult<Actor> {
        let mut result = self
            .db
            .query("SELECT * FROM type::record('app_user', $uid)")
            .bind(("uid", uid.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: uid.to_string(),
        })?;

        Ok(row.into_actor(uid.to_string())?)
    }
}
